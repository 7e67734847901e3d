//! Running one completion and printing it

use crate::app::App;
use crate::render::Renderer;
use futures::StreamExt;
use parley_core::{CompletionRequest, Fragment, OutputStrategy, ParleyError, ParleyResult};

/// Send `request` through the layers and render its output.
///
/// Returns the model text. Ctrl-C drops the stream, which closes the
/// connection and keeps partial output out of the cache and chat.
pub async fn run_completion(
    app: &App,
    request: CompletionRequest,
    strategy: OutputStrategy,
) -> ParleyResult<String> {
    let mut renderer = Renderer::new(
        strategy,
        &app.config.default_color,
        app.config.prettify_markdown,
    );
    if !app.streaming {
        renderer.start_spinner();
    }

    let mut stream = app.completion.complete(request).await?;
    let mut text = String::new();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = &mut interrupt => {
                renderer.finish()?;
                return Err(ParleyError::Cancelled);
            }
            item = stream.next() => match item {
                Some(Ok(fragment)) => {
                    if let Fragment::Text(t) = &fragment {
                        text.push_str(t);
                    }
                    renderer.write(&fragment)?;
                }
                Some(Err(e)) => {
                    renderer.finish()?;
                    return Err(e);
                }
                None => break,
            }
        }
    }

    renderer.finish()?;
    Ok(text)
}
