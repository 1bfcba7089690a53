//! LocalStack test setup utilities

#![allow(dead_code)]

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_sqs::Client as SqsClient;
use sqs_deque::queue::SqsApiClient;
use std::sync::Arc;
use uuid::Uuid;

/// Test context that provides an SQS client and a unique queue name
pub struct QueueTestContext {
    pub sqs_client: Arc<SqsClient>,
    pub queue_name: String,
}

impl QueueTestContext {
    /// Creates a context for a queue that does not exist yet
    pub async fn new(test_name: &str, fifo: bool) -> Self {
        let suffix = if fifo { ".fifo" } else { "" };
        let queue_name = format!("{}-{}{}", test_name, Uuid::new_v4(), suffix);

        // Setup LocalStack client with hardcoded credentials for CI
        let credentials = Credentials::from_keys(
            "test", // AWS_ACCESS_KEY_ID
            "test", // AWS_SECRET_ACCESS_KEY
            None,   // no session token
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url("http://localhost:4566")
            .region(aws_config::Region::new("us-east-1"))
            .credentials_provider(credentials)
            .load()
            .await;

        Self {
            sqs_client: Arc::new(SqsClient::new(&config)),
            queue_name,
        }
    }

    /// SQS API over the context's client
    pub fn api(&self) -> Arc<SqsApiClient> {
        Arc::new(SqsApiClient::new(self.sqs_client.clone()))
    }

    /// Deletes the queue if the test created it
    pub async fn cleanup(self) {
        if let Ok(result) = self
            .sqs_client
            .get_queue_url()
            .queue_name(&self.queue_name)
            .send()
            .await
        {
            if let Some(queue_url) = result.queue_url() {
                let _ = self
                    .sqs_client
                    .delete_queue()
                    .queue_url(queue_url)
                    .send()
                    .await;
            }
        }
    }
}
