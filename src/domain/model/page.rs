use crate::domain::error::DomainError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// 1始まりのページ指定。生成時に `page >= 1` と `page_size >= 1` を検証済み。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

/// ストレージに渡す取得範囲。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE as u64,
            page_size: DEFAULT_PAGE_SIZE as u64,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Result<Self, DomainError> {
        if page < 1 || page_size < 1 {
            return Err(DomainError::InvalidArgument(
                "page and pageSize must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            page: page as u64,
            page_size: page_size as u64,
        })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// `ceil(total / page_size)`。空なら0。
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.page_size)
    }

    /// 総件数に対する取得範囲を決める。
    ///
    /// An empty collection answers page 1 with an empty window (`None`);
    /// any other page past the last one is `PageOutOfRange`.
    pub fn window(&self, total: u64) -> Result<Option<PageWindow>, DomainError> {
        let total_pages = self.total_pages(total);
        if total == 0 && self.page == 1 {
            return Ok(None);
        }
        if self.page > total_pages {
            return Err(DomainError::PageOutOfRange {
                page: self.page,
                total_pages,
            });
        }
        Ok(Some(PageWindow {
            offset: (self.page - 1) * self.page_size,
            limit: self.page_size,
        }))
    }
}
