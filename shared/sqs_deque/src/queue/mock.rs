use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use aws_sdk_sqs::types::QueueAttributeName;
use uuid::Uuid;

use crate::queue::client::SqsApi;
use crate::queue::error::RemoteError;
use crate::queue::types::{OutgoingMessage, ReceivedMessage, MAX_BATCH_SIZE};

const NON_EXISTENT_QUEUE: &str = "AWS.SimpleQueueService.NonExistentQueue";
const QUEUE_URL_PREFIX: &str = "https://sqs.mock.local/000000000000/";

/// Remote calls recorded by [`InMemorySqs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `GetQueueUrl`
    GetQueueUrl,
    /// `CreateQueue`
    CreateQueue,
    /// `GetQueueAttributes`
    GetQueueAttributes,
    /// `SendMessage` with the sent message
    SendMessage(OutgoingMessage),
    /// `SendMessageBatch` with the sent entries
    SendMessageBatch(Vec<OutgoingMessage>),
    /// `ReceiveMessage`
    ReceiveMessage,
    /// `DeleteMessage`
    DeleteMessage,
    /// `PurgeQueue`
    PurgeQueue,
}

/// Which call an injected failure applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `GetQueueUrl`
    GetQueueUrl,
    /// `CreateQueue`
    CreateQueue,
    /// `GetQueueAttributes`
    GetQueueAttributes,
    /// `SendMessage`
    SendMessage,
    /// `SendMessageBatch`
    SendMessageBatch,
    /// `ReceiveMessage`
    ReceiveMessage,
    /// `DeleteMessage`
    DeleteMessage,
    /// `PurgeQueue`
    PurgeQueue,
}

#[derive(Default)]
struct MockQueue {
    fifo: bool,
    messages: VecDeque<Option<String>>,
    in_flight: HashMap<String, Option<String>>,
    seen_deduplication_ids: HashSet<String>,
    attribute_overrides: HashMap<QueueAttributeName, String>,
}

#[derive(Default)]
struct State {
    queues: HashMap<String, MockQueue>,
    calls: Vec<Call>,
    failures: HashMap<CallKind, VecDeque<RemoteError>>,
}

/// In-memory stand-in for SQS
///
/// Received messages stay in flight until deleted and are never redelivered.
#[derive(Default)]
pub struct InMemorySqs {
    state: Mutex<State>,
}

impl InMemorySqs {
    /// Creates a mock with no queues
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an existing queue
    #[must_use]
    pub fn with_queue(self, queue_name: &str, fifo: bool) -> Self {
        self.lock().queues.insert(
            queue_name.to_string(),
            MockQueue {
                fifo,
                ..MockQueue::default()
            },
        );
        self
    }

    /// Makes the next call of the given kind fail with `error`
    pub fn fail_next(&self, kind: CallKind, error: RemoteError) {
        self.lock().failures.entry(kind).or_default().push_back(error);
    }

    /// Returns every call made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Returns the entries of every `SendMessageBatch` call, in order
    #[must_use]
    pub fn sent_batches(&self) -> Vec<Vec<OutgoingMessage>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::SendMessageBatch(entries) => Some(entries.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns every message sent, singly or batched, in order
    #[must_use]
    pub fn sent_messages(&self) -> Vec<OutgoingMessage> {
        self.lock()
            .calls
            .iter()
            .flat_map(|call| match call {
                Call::SendMessage(message) => vec![message.clone()],
                Call::SendMessageBatch(entries) => entries.clone(),
                _ => Vec::new(),
            })
            .collect()
    }

    /// Checks whether a queue exists
    #[must_use]
    pub fn has_queue(&self, queue_name: &str) -> bool {
        self.lock().queues.contains_key(queue_name)
    }

    /// Number of visible messages in a queue
    #[must_use]
    pub fn visible_count(&self, queue_name: &str) -> usize {
        self.lock()
            .queues
            .get(queue_name)
            .map_or(0, |queue| queue.messages.len())
    }

    /// Number of received but not yet deleted messages in a queue
    #[must_use]
    pub fn in_flight_count(&self, queue_name: &str) -> usize {
        self.lock()
            .queues
            .get(queue_name)
            .map_or(0, |queue| queue.in_flight.len())
    }

    /// Puts a raw body on a queue, bypassing the envelope encoding
    ///
    /// `None` delivers a message without a body.
    pub fn push_raw(&self, queue_name: &str, body: Option<&str>) {
        if let Some(queue) = self.lock().queues.get_mut(queue_name) {
            queue.messages.push_back(body.map(ToString::to_string));
        }
    }

    /// Reports `value` for an attribute instead of the computed one
    pub fn set_attribute(&self, queue_name: &str, name: QueueAttributeName, value: &str) {
        if let Some(queue) = self.lock().queues.get_mut(queue_name) {
            queue.attribute_overrides.insert(name, value.to_string());
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn queue_url(queue_name: &str) -> String {
    format!("{QUEUE_URL_PREFIX}{queue_name}")
}

fn non_existent_queue() -> RemoteError {
    RemoteError::new(NON_EXISTENT_QUEUE, "The specified queue does not exist.").with_status(400)
}

impl State {
    fn record(&mut self, kind: CallKind, call: Call) -> Result<(), RemoteError> {
        self.calls.push(call);
        match self.failures.get_mut(&kind).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn queue_mut(&mut self, url: &str) -> Result<&mut MockQueue, RemoteError> {
        url.strip_prefix(QUEUE_URL_PREFIX)
            .and_then(|name| self.queues.get_mut(name))
            .ok_or_else(non_existent_queue)
    }

    fn enqueue(queue: &mut MockQueue, message: OutgoingMessage) -> Result<(), RemoteError> {
        if queue.fifo {
            if message.message_group_id.is_none() {
                return Err(RemoteError::new(
                    "MissingParameter",
                    "The request must contain the parameter MessageGroupId.",
                )
                .with_status(400));
            }
            if let Some(id) = message.deduplication_id {
                if !queue.seen_deduplication_ids.insert(id) {
                    return Ok(());
                }
            }
        }
        queue.messages.push_back(Some(message.body));
        Ok(())
    }
}

#[async_trait::async_trait]
impl SqsApi for InMemorySqs {
    async fn get_queue_url(&self, queue_name: &str) -> Result<String, RemoteError> {
        let mut state = self.lock();
        state.record(CallKind::GetQueueUrl, Call::GetQueueUrl)?;
        if state.queues.contains_key(queue_name) {
            Ok(queue_url(queue_name))
        } else {
            Err(non_existent_queue())
        }
    }

    async fn create_queue(&self, queue_name: &str, fifo: bool) -> Result<String, RemoteError> {
        let mut state = self.lock();
        state.record(CallKind::CreateQueue, Call::CreateQueue)?;
        state
            .queues
            .entry(queue_name.to_string())
            .or_insert_with(|| MockQueue {
                fifo,
                ..MockQueue::default()
            });
        Ok(queue_url(queue_name))
    }

    async fn get_queue_attributes(
        &self,
        queue_url: &str,
        attribute_names: &[QueueAttributeName],
    ) -> Result<HashMap<QueueAttributeName, String>, RemoteError> {
        let mut state = self.lock();
        state.record(CallKind::GetQueueAttributes, Call::GetQueueAttributes)?;
        let queue = state.queue_mut(queue_url)?;

        let wants = |name: &QueueAttributeName| {
            attribute_names.contains(&QueueAttributeName::All) || attribute_names.contains(name)
        };

        let mut attributes = HashMap::new();
        if wants(&QueueAttributeName::ApproximateNumberOfMessages) {
            attributes.insert(
                QueueAttributeName::ApproximateNumberOfMessages,
                queue.messages.len().to_string(),
            );
        }
        if wants(&QueueAttributeName::ApproximateNumberOfMessagesNotVisible) {
            attributes.insert(
                QueueAttributeName::ApproximateNumberOfMessagesNotVisible,
                queue.in_flight.len().to_string(),
            );
        }
        // SQS only reports FifoQueue for FIFO queues
        if queue.fifo && wants(&QueueAttributeName::FifoQueue) {
            attributes.insert(QueueAttributeName::FifoQueue, "true".to_string());
        }
        for (name, value) in &queue.attribute_overrides {
            if wants(name) {
                attributes.insert(name.clone(), value.clone());
            }
        }
        Ok(attributes)
    }

    async fn send_message(
        &self,
        queue_url: &str,
        message: OutgoingMessage,
    ) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.record(CallKind::SendMessage, Call::SendMessage(message.clone()))?;
        State::enqueue(state.queue_mut(queue_url)?, message)
    }

    async fn send_message_batch(
        &self,
        queue_url: &str,
        entries: Vec<OutgoingMessage>,
    ) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.record(
            CallKind::SendMessageBatch,
            Call::SendMessageBatch(entries.clone()),
        )?;
        if entries.is_empty() {
            return Err(RemoteError::new(
                "AWS.SimpleQueueService.EmptyBatchRequest",
                "There should be at least one SendMessageBatchRequestEntry in the request.",
            )
            .with_status(400));
        }
        if entries.len() > MAX_BATCH_SIZE {
            return Err(RemoteError::new(
                "AWS.SimpleQueueService.TooManyEntriesInBatchRequest",
                "Maximum number of entries per request are 10.",
            )
            .with_status(400));
        }
        let queue = state.queue_mut(queue_url)?;
        for message in entries {
            State::enqueue(queue, message)?;
        }
        Ok(())
    }

    async fn receive_message(&self, queue_url: &str) -> Result<Option<ReceivedMessage>, RemoteError> {
        let mut state = self.lock();
        state.record(CallKind::ReceiveMessage, Call::ReceiveMessage)?;
        let queue = state.queue_mut(queue_url)?;

        let Some(body) = queue.messages.pop_front() else {
            return Ok(None);
        };
        let receipt_handle = Uuid::new_v4().to_string();
        queue.in_flight.insert(receipt_handle.clone(), body.clone());

        Ok(Some(ReceivedMessage {
            body,
            receipt_handle,
            message_id: Some(Uuid::new_v4().to_string()),
        }))
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.record(CallKind::DeleteMessage, Call::DeleteMessage)?;
        let queue = state.queue_mut(queue_url)?;

        if queue.in_flight.remove(receipt_handle).is_some() {
            Ok(())
        } else {
            Err(RemoteError::new(
                "ReceiptHandleIsInvalid",
                format!("The input receipt handle \"{receipt_handle}\" is not a valid receipt handle."),
            )
            .with_status(400))
        }
    }

    async fn purge_queue(&self, queue_url: &str) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.record(CallKind::PurgeQueue, Call::PurgeQueue)?;
        let queue = state.queue_mut(queue_url)?;
        queue.messages.clear();
        Ok(())
    }
}
