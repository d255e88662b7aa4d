use std::sync::Arc;

use thiserror::Error;

use crate::{util::non_empty, Database, DatabaseError, MessageData, NewMessage, PrimaryKey, UserData};

/// The chat between students and admins
pub struct Messaging<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Message cannot be empty")]
    EmptyContent,
    #[error("Choose a student to reply to")]
    MissingReceiver,
    #[error("There is no admin to receive messages yet")]
    NoAdmin,
    #[error("User {0} doesn't exist")]
    UnknownReceiver(PrimaryKey),
    #[error(transparent)]
    Db(DatabaseError),
}

impl<Db> Messaging<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Sends a message.
    ///
    /// Students always write to the default admin, so `receiver_id` is ignored for them.
    /// Admins have to say who they're replying to.
    pub async fn send(
        &self,
        sender: &UserData,
        receiver_id: Option<PrimaryKey>,
        content: &str,
    ) -> Result<MessageData, MessageError> {
        let content = non_empty(content).ok_or(MessageError::EmptyContent)?;

        let receiver = if sender.is_admin() {
            let receiver_id = receiver_id.ok_or(MessageError::MissingReceiver)?;

            self.db.user_by_id(receiver_id).await.map_err(|e| match e {
                DatabaseError::NotFound { .. } => MessageError::UnknownReceiver(receiver_id),
                e => MessageError::Db(e),
            })?
        } else {
            self.db.default_admin().await.map_err(|e| match e {
                DatabaseError::NotFound { .. } => MessageError::NoAdmin,
                e => MessageError::Db(e),
            })?
        };

        self.db
            .create_message(NewMessage {
                sender_id: sender.id,
                receiver_id: receiver.id,
                content,
            })
            .await
            .map_err(MessageError::Db)
    }

    /// Every message the user sent or received, oldest first
    pub async fn conversation(&self, user_id: PrimaryKey) -> Result<Vec<MessageData>, DatabaseError> {
        self.db.conversation_for(user_id).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{register_admin, register_student, setup_test_ledger};

    #[tokio::test]
    async fn empty_messages_are_not_stored() {
        let ledger = setup_test_ledger().await;
        register_admin(&ledger, "root").await;
        let student = register_student(&ledger, "ada").await;

        for content in ["", "   \n"] {
            let result = ledger.messaging.send(&student, None, content).await;
            assert!(matches!(result, Err(MessageError::EmptyContent)));
        }

        assert!(ledger.messaging.conversation(student.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn students_write_to_the_default_admin() {
        let ledger = setup_test_ledger().await;
        let first_admin = register_admin(&ledger, "root").await;
        let second_admin = register_admin(&ledger, "deputy").await;
        let student = register_student(&ledger, "ada").await;

        let message = ledger
            .messaging
            .send(&student, Some(second_admin.id), "When does it start?")
            .await
            .unwrap();

        assert_eq!(message.sender_id, student.id);
        assert_eq!(message.receiver_id, first_admin.id);
        assert!(!message.is_read);
    }

    #[tokio::test]
    async fn students_need_an_admin() {
        let ledger = setup_test_ledger().await;
        let student = register_student(&ledger, "ada").await;

        let result = ledger.messaging.send(&student, None, "Hello?").await;
        assert!(matches!(result, Err(MessageError::NoAdmin)));
    }

    #[tokio::test]
    async fn admins_reply_to_a_chosen_user() {
        let ledger = setup_test_ledger().await;
        let admin = register_admin(&ledger, "root").await;
        let student = register_student(&ledger, "ada").await;

        let missing = ledger.messaging.send(&admin, None, "Hi").await;
        assert!(matches!(missing, Err(MessageError::MissingReceiver)));

        let unknown = ledger.messaging.send(&admin, Some(404), "Hi").await;
        assert!(matches!(unknown, Err(MessageError::UnknownReceiver(404))));

        let reply = ledger
            .messaging
            .send(&admin, Some(student.id), "  At ten.  ")
            .await
            .unwrap();
        assert_eq!(reply.receiver_id, student.id);
        assert_eq!(reply.content, "At ten.");
    }

    #[tokio::test]
    async fn conversations_are_in_order() {
        let ledger = setup_test_ledger().await;
        let admin = register_admin(&ledger, "root").await;
        let ada = register_student(&ledger, "ada").await;
        let grace = register_student(&ledger, "grace").await;

        ledger.messaging.send(&ada, None, "first").await.unwrap();
        ledger.messaging.send(&grace, None, "unrelated").await.unwrap();
        ledger.messaging.send(&admin, Some(ada.id), "second").await.unwrap();
        ledger.messaging.send(&ada, None, "third").await.unwrap();

        let contents: Vec<_> = ledger
            .messaging
            .conversation(ada.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);

        assert_eq!(ledger.messaging.conversation(admin.id).await.unwrap().len(), 4);
    }
}
