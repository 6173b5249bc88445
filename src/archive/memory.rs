use async_trait::async_trait;
use dashmap::DashMap;

use super::{error::ArchiveResult, traits::MessageArchiver};
use crate::models::Message;

/// In-memory archiver using DashMap for concurrent access.
///
/// Archived copies live only as long as the process; useful for embedding the
/// pruner and for tests.
#[derive(Default)]
pub struct MemoryArchiver {
    messages: DashMap<(String, i64), Message>,
}

impl MemoryArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a message as if an earlier run had archived it.
    pub fn mark_archived(&self, message: Message) {
        self.messages
            .insert((message.channel_id.clone(), message.message_id), message);
    }

    /// Get the archived copy of a message.
    pub fn get(&self, channel_id: &str, message_id: i64) -> Option<Message> {
        self.messages
            .get(&(channel_id.to_string(), message_id))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[async_trait]
impl MessageArchiver for MemoryArchiver {
    async fn is_archived(&self, channel_id: &str, message_id: i64) -> ArchiveResult<bool> {
        Ok(self
            .messages
            .contains_key(&(channel_id.to_string(), message_id)))
    }

    async fn archive(&self, message: &Message) -> ArchiveResult<()> {
        self.messages.insert(
            (message.channel_id.clone(), message.message_id),
            message.clone(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Arc};

    use chrono::Utc;

    use super::*;

    fn message(message_id: i64) -> Message {
        Message {
            message_id,
            channel_id: "chan".to_string(),
            received_date: Utc::now(),
            processed: true,
            server_id: "node-1".to_string(),
            import_id: None,
            connector_messages: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_concurrent_archive() {
        let archiver = Arc::new(MemoryArchiver::new());
        let mut handles = Vec::new();
        for id in 0..32 {
            let archiver = Arc::clone(&archiver);
            handles.push(tokio::spawn(async move {
                archiver.archive(&message(id)).await.unwrap();
                archiver.is_archived("chan", id).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(archiver.len(), 32);
        assert_eq!(archiver.get("chan", 7).unwrap().message_id, 7);
    }

    #[tokio::test]
    async fn test_mark_archived_stores_copy() {
        let archiver = MemoryArchiver::new();
        assert!(archiver.is_empty());

        archiver.mark_archived(message(4));
        assert!(archiver.is_archived("chan", 4).await.unwrap());
        assert!(!archiver.is_archived("other", 4).await.unwrap());
        assert_eq!(archiver.get("chan", 4).unwrap().message_id, 4);
        assert_eq!(archiver.len(), 1);
    }
}
