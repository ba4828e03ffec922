//! Paginated Bulk Loader
//!
//! Fetches a complete collection in fixed-size pages. Pages are requested one
//! after another, each starting where the previous one ended, and are
//! concatenated in order; the loop ends at the first page that comes back
//! empty. No total count is assumed.

use async_trait::async_trait;

use super::error::{SourceError, SourceResult};

/// A remote collection that can answer "records at offset O, limit P"
#[async_trait]
pub trait PageSource<E>: Send + Sync {
    /// Fetch up to `limit` records starting at zero-based `offset`
    async fn fetch_page(&self, offset: usize, limit: usize) -> SourceResult<Vec<E>>;
}

/// Sequential page loader
#[derive(Debug, Clone, Copy)]
pub struct PaginatedLoader {
    page_size: usize,
}

impl PaginatedLoader {
    /// Create a loader; `page_size` must be positive
    pub fn new(page_size: usize) -> SourceResult<Self> {
        if page_size == 0 {
            return Err(SourceError::InvalidPageSize(page_size));
        }
        Ok(Self { page_size })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Load every record from `source`
    ///
    /// Any page failure aborts the whole load; already-fetched pages are
    /// dropped along with the partial result.
    pub async fn load_all<E, S>(&self, source: &S) -> SourceResult<Vec<E>>
    where
        E: Send,
        S: PageSource<E> + ?Sized,
    {
        let mut records = Vec::new();
        let mut offset = 0;
        let mut pages = 0u32;

        loop {
            let mut page = source.fetch_page(offset, self.page_size).await?;
            pages += 1;

            if page.is_empty() {
                break;
            }

            tracing::trace!(offset, fetched = page.len(), "Fetched page");
            offset += page.len();
            records.append(&mut page);
        }

        tracing::debug!(
            records = records.len(),
            pages,
            page_size = self.page_size,
            "Bulk load complete"
        );

        Ok(records)
    }
}
