use fluent_collections::*;
use futures_util::stream::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counted(items: Vec<i32>) -> (Pipeline<i32>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let pipeline = lazy(items).map(move |n| {
        counter.fetch_add(1, Ordering::SeqCst);
        n
    });
    (pipeline, calls)
}

#[tokio::test]
async fn test_cursor_yields_sized_chunks() {
    let chunks: Vec<Vec<i32>> = lazy((1..=7).collect::<Vec<i32>>())
        .cursor(3)
        .map(|chunk| chunk.unwrap())
        .collect()
        .await;
    assert_eq!(chunks, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
}

#[tokio::test]
async fn test_cursor_exact_multiple_has_no_trailing_chunk() {
    let chunks: Vec<_> = lazy(vec![1, 2, 3, 4]).cursor(2).collect().await;
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|chunk| chunk.as_ref().unwrap().len() == 2));
}

#[tokio::test]
async fn test_cursor_empty_source_yields_nothing() {
    let mut cursor = empty::<i32>().cursor(4);
    assert!(cursor.next().await.is_none());
}

#[tokio::test]
async fn test_cursor_is_lazy() {
    let (pipeline, calls) = counted((1..=10).collect());
    let mut cursor = pipeline.cursor(4);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let first = cursor.next().await.unwrap().unwrap();
    assert_eq!(first, vec![1, 2, 3, 4]);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let second = cursor.next().await.unwrap().unwrap();
    assert_eq!(second, vec![5, 6, 7, 8]);
    assert_eq!(calls.load(Ordering::SeqCst), 8);

    drop(cursor);
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_cursor_over_chunked_pipeline() {
    let chunks: Vec<Vec<Vec<i32>>> = lazy((1..=5).collect::<Vec<i32>>())
        .chunk(2)
        .cursor(2)
        .map(|chunk| chunk.unwrap())
        .collect()
        .await;
    assert_eq!(chunks, vec![vec![vec![1, 2], vec![3, 4]], vec![vec![5]]]);
}

#[tokio::test]
async fn test_cursor_error_ends_cursor() {
    let pipeline = lazy(vec![1, 2, 3, 4, 5]).try_map(|n| {
        if n == 4 {
            Err("cannot process 4")
        } else {
            Ok(n)
        }
    });
    let mut cursor = pipeline.cursor(2);

    assert_eq!(cursor.next().await.unwrap().unwrap(), vec![1, 2]);
    let err = cursor.next().await.unwrap().unwrap_err();
    assert!(matches!(err, PipelineError::Callback(_)));
    assert!(cursor.next().await.is_none());
}

#[tokio::test]
async fn test_stream_reads_one_at_a_time() {
    let (pipeline, calls) = counted(vec![10, 20, 30]);
    let mut stream = pipeline.stream();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(stream.read().await.unwrap(), Some(10));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!stream.is_done());

    assert_eq!(stream.read().await.unwrap(), Some(20));
    assert_eq!(stream.read().await.unwrap(), Some(30));
    assert_eq!(stream.read().await.unwrap(), None);
    assert!(stream.is_done());
    assert_eq!(stream.state(), PullerState::Exhausted);
}

#[tokio::test]
async fn test_stream_done_repeatedly() {
    let mut stream = lazy(vec![1]).stream();
    assert_eq!(stream.read().await.unwrap(), Some(1));
    for _ in 0..3 {
        assert_eq!(stream.read().await.unwrap(), None);
    }
}

#[tokio::test]
async fn test_stream_after_take_reports_stopped() {
    let (pipeline, calls) = counted(vec![1, 2, 3]);
    let mut stream = pipeline.take(1).stream();
    assert_eq!(stream.read().await.unwrap(), Some(1));
    assert!(!stream.is_done());

    assert_eq!(stream.read().await.unwrap(), None);
    assert!(stream.is_done());
    assert_eq!(stream.state(), PullerState::Stopped);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stream_read_expands_one_output_at_a_time() {
    let expanded = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&expanded);
    let mut stream = lazy(vec![1u32, 2])
        .flat_map(move |n| {
            let counter = Arc::clone(&counter);
            (0..5).map(move |i| {
                counter.fetch_add(1, Ordering::SeqCst);
                n * 10 + i
            })
        })
        .stream();

    assert_eq!(stream.read().await.unwrap(), Some(10));
    assert_eq!(expanded.load(Ordering::SeqCst), 1);
    assert_eq!(stream.read().await.unwrap(), Some(11));
    assert_eq!(expanded.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stream_error_then_done() {
    let mut stream = lazy(vec![1, 2])
        .try_filter(|n| if *n == 2 { Err("no twos") } else { Ok(true) })
        .stream();

    assert_eq!(stream.read().await.unwrap(), Some(1));
    assert!(stream.read().await.is_err());
    assert!(stream.is_done());
    assert_eq!(stream.state(), PullerState::Failed);
    assert_eq!(stream.read().await.unwrap(), None);
}

#[tokio::test]
async fn test_element_stream_implements_stream() {
    let doubled: Vec<i32> = lazy(vec![1, 2, 3])
        .map(|n| n * 2)
        .stream()
        .map(|item| item.unwrap())
        .collect()
        .await;
    assert_eq!(doubled, vec![2, 4, 6]);
}

#[test]
fn test_element_stream_polls_ready() {
    let mut stream = lazy(vec![1, 2]).stream();

    let mut next = tokio_test::task::spawn(stream.next());
    let item = tokio_test::assert_ready!(next.poll());
    assert_eq!(item.map(|item| item.unwrap()), Some(1));
}

#[tokio::test]
async fn test_independent_traversals() {
    let pipeline = lazy(vec!['x', 'y', 'z']);
    let mut first = pipeline.stream();
    let mut second = pipeline.stream();

    assert_eq!(first.read().await.unwrap(), Some('x'));
    assert_eq!(first.read().await.unwrap(), Some('y'));
    assert_eq!(second.read().await.unwrap(), Some('x'));

    let rest: Vec<Vec<char>> = pipeline
        .cursor(10)
        .map(|chunk| chunk.unwrap())
        .collect()
        .await;
    assert_eq!(rest, vec![vec!['x', 'y', 'z']]);
}
