use std::future::Future;

use crate::{
    errors::RequestError,
    models::{Art, Comment},
};

/// A record that remembers who created it.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

impl Owned for Art {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }
}

/// Loads a record and admits only its owner. A missing record is reported
/// as `NotFound(what)`, anyone else as `Forbidden`.
pub async fn ensure_owner<T, F>(
    loader: F,
    requester_id: i64,
    what: &'static str,
) -> Result<T, RequestError>
where
    T: Owned,
    F: Future<Output = Result<Option<T>, RequestError>>,
{
    let record = loader.await?.ok_or(RequestError::NotFound(what))?;
    if record.owner_id() != requester_id {
        tracing::debug!(
            resource = what,
            owner = record.owner_id(),
            requester = requester_id,
            "rejected mutation by non-owner"
        );
        return Err(RequestError::Forbidden("Only the owner can modify this resource"));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note {
        owner: i64,
    }

    impl Owned for Note {
        fn owner_id(&self) -> i64 {
            self.owner
        }
    }

    async fn load(owner: Option<i64>) -> Result<Option<Note>, RequestError> {
        Ok(owner.map(|owner| Note { owner }))
    }

    #[tokio::test]
    async fn owner_passes() {
        let note = ensure_owner(load(Some(3)), 3, "Note").await.unwrap();
        assert_eq!(note.owner, 3);
    }

    #[tokio::test]
    async fn stranger_is_forbidden() {
        let result = ensure_owner(load(Some(3)), 4, "Note").await;
        assert!(matches!(result, Err(RequestError::Forbidden(_))));
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let result = ensure_owner(load(None), 4, "Note").await;
        assert!(matches!(result, Err(RequestError::NotFound("Note"))));
    }
}
