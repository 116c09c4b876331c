//! Resource management

use crate::error::PipelineError;

use tokio::sync::{Semaphore, SemaphorePermit};

/// [crate::resource_manager::ResourceManager] bounds the number of archives in flight. Resource
/// management is performed using a Tokio Semaphore for each type of resource.
#[derive(Debug)]
pub struct ResourceManager {
    /// Optional semaphore for downloads.
    downloads: Option<Semaphore>,

    /// Optional semaphore for archive tasks.
    tasks: Option<Semaphore>,
}

impl ResourceManager {
    /// Returns a new ResourceManager object.
    pub fn new(download_limit: Option<usize>, task_limit: Option<usize>) -> Self {
        Self {
            downloads: download_limit.map(Semaphore::new),
            tasks: task_limit.map(Semaphore::new),
        }
    }

    /// Acquire a download resource.
    pub async fn download(&self) -> Result<Option<SemaphorePermit>, PipelineError> {
        optional_acquire(&self.downloads).await
    }

    /// Acquire a task resource.
    pub async fn task(&self) -> Result<Option<SemaphorePermit>, PipelineError> {
        optional_acquire(&self.tasks).await
    }
}

/// Acquire a permit on an optional Semaphore, if present.
async fn optional_acquire(
    sem: &Option<Semaphore>,
) -> Result<Option<SemaphorePermit>, PipelineError> {
    if let Some(sem) = sem {
        sem.acquire().await.map(Some).map_err(|err| err.into())
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::TryAcquireError;

    #[tokio::test]
    async fn no_resource_management() {
        let rm = ResourceManager::new(None, None);
        assert!(rm.downloads.is_none());
        assert!(rm.tasks.is_none());
        let d = rm.download().await.unwrap();
        let t = rm.task().await.unwrap();
        assert!(d.is_none());
        assert!(t.is_none());
    }

    #[tokio::test]
    async fn limited_tasks() {
        let rm = ResourceManager::new(Some(1), Some(2));
        let _d = rm.download().await.unwrap();
        let _t1 = rm.task().await.unwrap();
        let t2 = rm.task().await.unwrap();
        assert!(t2.is_some());
        // Check that there are no more resources (without blocking).
        assert_eq!(
            rm.downloads.as_ref().unwrap().try_acquire().err(),
            Some(TryAcquireError::NoPermits)
        );
        assert_eq!(
            rm.tasks.as_ref().unwrap().try_acquire().err(),
            Some(TryAcquireError::NoPermits)
        );
        // Dropping a permit releases it.
        drop(t2);
        assert!(rm.tasks.as_ref().unwrap().try_acquire().is_ok());
    }
}
