//! Ask command handler.

use answerflow_core::config::Config;
use answerflow_core::core::{AnswerSurface, StreamController, StreamError, session_channel};
use answerflow_core::transport::HttpBackend;
use anyhow::{Context, Result};

use crate::surface::TerminalSurface;

pub struct AskOptions<'a> {
    pub question: &'a str,
    pub conversation_id: Option<&'a str>,
    pub html: bool,
    pub no_stream: bool,
    pub config: &'a Config,
}

pub async fn run(options: AskOptions<'_>) -> Result<()> {
    let backend = HttpBackend::new(&options.config.backend).context("create backend client")?;
    let controller = StreamController::new(backend, options.config);
    let mut surface = TerminalSurface::stdio(options.html);

    if options.no_stream {
        return ask_once(&controller, &options, &mut surface).await;
    }

    let (handle, controls) = session_channel();
    let cancel = handle.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = controller
        .run_session(
            options.question,
            options.conversation_id,
            &mut surface,
            controls,
        )
        .await;
    ctrl_c.abort();

    let answer = result?;
    if answer.is_interrupted() {
        tracing::warn!(chars = answer.answer.len(), "answer is incomplete");
    }
    Ok(())
}

/// Non-streaming variant: one request, then the same resolve + present path.
async fn ask_once<S>(
    controller: &StreamController<HttpBackend>,
    options: &AskOptions<'_>,
    surface: &mut S,
) -> Result<()>
where
    S: AnswerSurface,
{
    surface.show_pending();
    let mut answer = match controller
        .transport()
        .ask(options.question, options.conversation_id)
        .await
    {
        Ok(answer) => answer,
        Err(err) => {
            surface.show_error(&err);
            return Err(StreamError::Transport(err).into());
        }
    };
    if answer.disclaimer.trim().is_empty() {
        answer
            .disclaimer
            .clone_from(&options.config.presentation.disclaimer);
    }

    let view = controller
        .presenter()
        .present_answer(&answer, controller.resolver());
    surface.begin_answer();
    surface.render_final(&answer, &view);
    Ok(())
}
