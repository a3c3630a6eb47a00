use crate::ast::{OffsetFetch, RowCount};
use crate::compiler::CompileError;
use crate::query::FetchQuery;

pub struct PagingResolver;

impl PagingResolver {
    pub fn resolve(top: Option<&RowCount>, offset_fetch: Option<&OffsetFetch>, query: &mut FetchQuery) -> Result<(), CompileError> {
        match (top, offset_fetch) {
            (Some(_), Some(window)) => {
                CompileError::unsupported("TOP cannot be combined with OFFSET/FETCH", window.span).err()
            }
            (Some(top), None) => {
                query.top = Some(Self::top(top)?);
                Ok(())
            }
            (None, Some(window)) => {
                let (page, count) = Self::page(window)?;
                query.page = Some(page);
                query.count = Some(count);
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }

    pub fn top(top: &RowCount) -> Result<u32, CompileError> {
        if top.value < 1 {
            return CompileError::unsupported("TOP must be at least 1", top.span).err();
        }
        u32::try_from(top.value).map_err(|_| CompileError::unsupported("TOP is too large", top.span))
    }

    /// OFFSET/FETCH as a 1-based page of FETCH rows; OFFSET must fall on a page boundary.
    pub fn page(window: &OffsetFetch) -> Result<(u32, u32), CompileError> {
        let (offset, fetch) = (window.offset.value, window.fetch.value);
        if offset < 0 {
            return CompileError::parse("OFFSET cannot be negative", window.offset.span).err();
        }
        if fetch < 1 {
            return CompileError::unsupported("FETCH must return at least one row", window.fetch.span).err();
        }
        if offset % fetch != 0 {
            return CompileError::unsupported(
                format!("OFFSET {} is not a multiple of FETCH {}; only whole pages can be fetched", offset, fetch),
                window.span,
            ).err();
        }
        let page = u32::try_from(offset / fetch + 1)
            .map_err(|_| CompileError::unsupported("OFFSET is too large", window.offset.span))?;
        let count = u32::try_from(fetch)
            .map_err(|_| CompileError::unsupported("FETCH is too large", window.fetch.span))?;
        Ok((page, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn window(offset: i64, fetch: i64) -> OffsetFetch {
        OffsetFetch {
            offset: RowCount { value: offset, span: Span::new(0, 2) },
            fetch: RowCount { value: fetch, span: Span::new(5, 7) },
            span: Span::new(0, 7),
        }
    }

    #[test]
    fn whole_pages_map_to_page_numbers() {
        assert_eq!(PagingResolver::page(&window(0, 50)).unwrap(), (1, 50));
        assert_eq!(PagingResolver::page(&window(20, 10)).unwrap(), (3, 10));
    }

    #[test]
    fn partial_pages_and_empty_fetches_fail() {
        assert!(PagingResolver::page(&window(15, 10)).is_err());
        assert!(PagingResolver::page(&window(0, 0)).is_err());
        assert!(PagingResolver::page(&window(-10, 10)).is_err());
    }

    #[test]
    fn top_and_window_are_exclusive() {
        let mut q = FetchQuery::new("account");
        let top = RowCount { value: 5, span: Span::new(7, 12) };
        assert!(PagingResolver::resolve(Some(&top), Some(&window(0, 5)), &mut q).is_err());
        PagingResolver::resolve(Some(&top), None, &mut q).unwrap();
        assert_eq!(q.top, Some(5));
    }
}
