use std::collections::HashMap;
use std::sync::Arc;

use aws_sdk_sqs::types::{QueueAttributeName, SendMessageBatchRequestEntry};
use aws_sdk_sqs::Client as SqsClient;

use crate::queue::error::RemoteError;
use crate::queue::types::{OutgoingMessage, ReceivedMessage};

/// The subset of the SQS API the deque adapter relies on
///
/// Every call returns the raw [`RemoteError`]; mapping onto the deque error
/// taxonomy happens in the adapter.
#[async_trait::async_trait]
pub trait SqsApi: Send + Sync {
    /// Resolves a queue name to its URL
    async fn get_queue_url(&self, queue_name: &str) -> Result<String, RemoteError>;

    /// Creates a queue and returns its URL
    async fn create_queue(&self, queue_name: &str, fifo: bool) -> Result<String, RemoteError>;

    /// Reads the requested queue attributes
    async fn get_queue_attributes(
        &self,
        queue_url: &str,
        attribute_names: &[QueueAttributeName],
    ) -> Result<HashMap<QueueAttributeName, String>, RemoteError>;

    /// Sends a single message
    async fn send_message(&self, queue_url: &str, message: OutgoingMessage)
        -> Result<(), RemoteError>;

    /// Sends up to ten messages in one call
    async fn send_message_batch(
        &self,
        queue_url: &str,
        entries: Vec<OutgoingMessage>,
    ) -> Result<(), RemoteError>;

    /// Receives at most one message
    async fn receive_message(&self, queue_url: &str) -> Result<Option<ReceivedMessage>, RemoteError>;

    /// Deletes a received message
    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<(), RemoteError>;

    /// Purges every message in the queue
    async fn purge_queue(&self, queue_url: &str) -> Result<(), RemoteError>;
}

/// [`SqsApi`] implementation over the AWS SDK client
pub struct SqsApiClient {
    sqs_client: Arc<SqsClient>,
}

impl SqsApiClient {
    /// Creates a new client
    ///
    /// # Arguments
    ///
    /// * `sqs_client` - Pre-configured SQS client
    #[must_use]
    pub const fn new(sqs_client: Arc<SqsClient>) -> Self {
        Self { sqs_client }
    }

    /// Creates a client from a shared AWS configuration
    #[must_use]
    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(Arc::new(SqsClient::new(config)))
    }
}

#[async_trait::async_trait]
impl SqsApi for SqsApiClient {
    async fn get_queue_url(&self, queue_name: &str) -> Result<String, RemoteError> {
        let result = self
            .sqs_client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await?;

        result
            .queue_url()
            .map(ToString::to_string)
            .ok_or_else(|| RemoteError::malformed("GetQueueUrl returned no queue URL"))
    }

    async fn create_queue(&self, queue_name: &str, fifo: bool) -> Result<String, RemoteError> {
        let mut request = self.sqs_client.create_queue().queue_name(queue_name);
        if fifo {
            request = request.attributes(QueueAttributeName::FifoQueue, "true");
        }

        let result = request.send().await?;

        result
            .queue_url()
            .map(ToString::to_string)
            .ok_or_else(|| RemoteError::malformed("CreateQueue returned no queue URL"))
    }

    async fn get_queue_attributes(
        &self,
        queue_url: &str,
        attribute_names: &[QueueAttributeName],
    ) -> Result<HashMap<QueueAttributeName, String>, RemoteError> {
        let result = self
            .sqs_client
            .get_queue_attributes()
            .queue_url(queue_url)
            .set_attribute_names(Some(attribute_names.to_vec()))
            .send()
            .await?;

        Ok(result.attributes().cloned().unwrap_or_default())
    }

    async fn send_message(
        &self,
        queue_url: &str,
        message: OutgoingMessage,
    ) -> Result<(), RemoteError> {
        self.sqs_client
            .send_message()
            .queue_url(queue_url)
            .message_body(message.body)
            .set_message_group_id(message.message_group_id)
            .set_message_deduplication_id(message.deduplication_id)
            .send()
            .await?;

        Ok(())
    }

    async fn send_message_batch(
        &self,
        queue_url: &str,
        entries: Vec<OutgoingMessage>,
    ) -> Result<(), RemoteError> {
        let entries = entries
            .into_iter()
            .map(|message| {
                SendMessageBatchRequestEntry::builder()
                    .id(message.id)
                    .message_body(message.body)
                    .set_message_group_id(message.message_group_id)
                    .set_message_deduplication_id(message.deduplication_id)
                    .build()
                    .map_err(|e| RemoteError::malformed(format!("Invalid batch entry: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = self
            .sqs_client
            .send_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await?;

        // SQS reports per-entry failures in a successful response
        if let Some(failed) = result.failed().first() {
            return Err(RemoteError::new(
                failed.code(),
                format!(
                    "{} of the batch entries failed, first ({}): {}",
                    result.failed().len(),
                    failed.id(),
                    failed.message().unwrap_or("no error message")
                ),
            ));
        }

        Ok(())
    }

    async fn receive_message(&self, queue_url: &str) -> Result<Option<ReceivedMessage>, RemoteError> {
        let result = self
            .sqs_client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(1)
            .send()
            .await?;

        let Some(message) = result.messages().first() else {
            return Ok(None);
        };

        let receipt_handle = message
            .receipt_handle()
            .ok_or_else(|| RemoteError::malformed("Received message has no receipt handle"))?
            .to_string();

        Ok(Some(ReceivedMessage {
            body: message.body().map(ToString::to_string),
            receipt_handle,
            message_id: message.message_id().map(ToString::to_string),
        }))
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<(), RemoteError> {
        self.sqs_client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await?;

        Ok(())
    }

    async fn purge_queue(&self, queue_url: &str) -> Result<(), RemoteError> {
        self.sqs_client
            .purge_queue()
            .queue_url(queue_url)
            .send()
            .await?;

        Ok(())
    }
}
