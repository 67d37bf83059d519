use crate::{error::Result, models::Fragment};
use futures::{Stream, StreamExt};

/// Drains the stream in arrival order and joins the fragment texts.
/// The first error ends accumulation; partial text is dropped with it.
pub async fn accumulate<S>(mut stream: S) -> Result<String>
where
    S: Stream<Item = Result<Fragment>> + Unpin,
{
    let mut text = String::new();
    let mut fragments = 0usize;

    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        fragments += 1;
        if let Some(content) = fragment.content {
            text.push_str(&content);
        }
    }

    log::debug!(
        "Accumulated {} fragments into {} characters",
        fragments,
        text.chars().count()
    );
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MenuError;
    use futures::stream;

    #[tokio::test]
    async fn test_missing_content_contributes_nothing() {
        let fragments = stream::iter(vec![
            Ok(Fragment::text("Hello")),
            Ok(Fragment::empty()),
            Ok(Fragment::text(" world")),
        ]);
        assert_eq!(accumulate(fragments).await.unwrap(), "Hello world");
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let fragments = stream::iter(Vec::<Result<Fragment>>::new());
        assert_eq!(accumulate(fragments).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_error_discards_partial_text() {
        let fragments = stream::iter(vec![
            Ok(Fragment::text("{\"dishes\":")),
            Err(MenuError::Model("stream reset".into())),
            Ok(Fragment::text("[]}")),
        ]);
        let err = accumulate(fragments).await.unwrap_err();
        assert!(matches!(err, MenuError::Model(msg) if msg == "stream reset"));
    }
}
