//! Forward-only paging over cursor-based store reads
//!
//! Pages are requested lazily, one at a time, as the stream is polled. The
//! only state carried between pages is the opaque cursor; a consumed stream
//! cannot be rewound, a new query has to be issued instead.

use super::traits::{ApplicationStore, EntityQuery, Page};
use crate::domain::{Entity, Result};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

enum Cursor {
    Start,
    Next(String),
    Done,
}

struct PageState<T, F> {
    fetch: F,
    cursor: Cursor,
    buffer: VecDeque<T>,
}

/// Turns a page fetcher into a stream of items
///
/// `fetch` receives `None` for the first page and the previous page's cursor
/// afterwards. The stream ends after a page without a cursor; the first error
/// ends it as well.
pub fn paginate<'a, T, F, Fut>(fetch: F) -> BoxStream<'a, Result<T>>
where
    T: Send + 'a,
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>>> + Send + 'a,
{
    let state = PageState {
        fetch,
        cursor: Cursor::Start,
        buffer: VecDeque::new(),
    };

    stream::try_unfold(state, next_item).boxed()
}

async fn next_item<T, F, Fut>(mut state: PageState<T, F>) -> Result<Option<(T, PageState<T, F>)>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    loop {
        if let Some(item) = state.buffer.pop_front() {
            return Ok(Some((item, state)));
        }

        let cursor = match std::mem::replace(&mut state.cursor, Cursor::Done) {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(cursor) => Some(cursor),
        };

        let page = (state.fetch)(cursor).await?;
        if let Some(next) = page.cursor {
            state.cursor = Cursor::Next(next);
        }
        state.buffer.extend(page.items);
    }
}

/// Streams every entity matching a collection search
pub fn search_entities(
    store: Arc<dyn ApplicationStore>,
    query: EntityQuery,
) -> BoxStream<'static, Result<Entity>> {
    paginate(move |cursor| {
        let store = Arc::clone(&store);
        let query = query.clone();
        async move { store.search_page(&query, cursor.as_deref()).await }
    })
}

/// Streams every target of one outbound connection type
pub fn connection_targets(
    store: Arc<dyn ApplicationStore>,
    source: Entity,
    connection_type: String,
    page_size: usize,
) -> BoxStream<'static, Result<Entity>> {
    paginate(move |cursor| {
        let store = Arc::clone(&store);
        let source = source.clone();
        let connection_type = connection_type.clone();
        async move {
            store
                .target_page(&source, &connection_type, page_size, cursor.as_deref())
                .await
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExportError, StoreError};
    use futures::TryStreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn numbered_pages(total: usize, page_size: usize, cursor: Option<String>) -> Page<usize> {
        let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + page_size).min(total);
        Page {
            items: (start..end).collect(),
            cursor: (end < total).then(|| end.to_string()),
        }
    }

    #[tokio::test]
    async fn test_paginate_walks_every_page() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let items: Vec<usize> = paginate(move |cursor| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(numbered_pages(7, 3, cursor)) }
        })
        .try_collect()
        .await
        .unwrap();

        assert_eq!(items, (0..7).collect::<Vec<_>>());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_paginate_is_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut stream = paginate(move |cursor| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(numbered_pages(100, 10, cursor)) }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_paginate_skips_empty_intermediate_pages() {
        let items: Vec<u8> = paginate(|cursor: Option<String>| async move {
            Ok(match cursor.as_deref() {
                None => Page {
                    items: vec![],
                    cursor: Some("b".to_string()),
                },
                Some(_) => Page::last(vec![1u8, 2]),
            })
        })
        .try_collect()
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_paginate_stops_on_error() {
        let result: Result<Vec<u8>> = paginate::<u8, _, _>(|_cursor| async move {
            Err(ExportError::Store(StoreError::ReadFailed("boom".to_string())))
        })
        .try_collect()
        .await;

        assert!(matches!(
            result,
            Err(ExportError::Store(StoreError::ReadFailed(_)))
        ));
    }
}
