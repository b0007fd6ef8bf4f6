//! Terminal loops: the story pages and the chatbot.
//!
//! In story mode the shell plays the child's part. It starts the landing
//! intro, presses next once the button unlocks, picks the configured style
//! once its option appears, then treats every typed line as something said
//! into the speak button.

use std::sync::Arc;

use storyteller_backend::StoryBackend;
use storyteller_core::audio::{AudioBackend, ClipId};
use storyteller_core::clock::SystemClock;
use storyteller_core::navigation::{Navigation, Route};
use storyteller_core::speech::RecognitionConfig;
use storyteller_pages::PageContext;
use storyteller_pages::chat::{ChatPage, ChatServices, ChatSettings, SPEAK_BUTTON_GATE};
use storyteller_pages::conversation::{ChatMessage, Conversation, MessageBody, Sender};
use storyteller_pages::landing::{LandingPage, NEXT_BUTTON_GATE};
use storyteller_pages::narration::NarrationPlayer;
use storyteller_pages::style_choose::{StoryStyle, StyleChoosePage};
use storyteller_pages::voice_input::VoiceInput;
use storyteller_sequencer::application::music::MusicProvider;
use storyteller_sequencer::domain::page_state::PageState;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::console::{ChannelNavigator, ConsoleNotifier, ConsoleRecognizer};
use crate::error::AppError;

/// Clip shared by the landing and style-choose pages.
pub const BACKGROUND_MUSIC: &str = "background-music";
/// Chatbot lines starting with this ask for a word explanation.
pub const EXPLAIN_PREFIX: &str = "explain:";
/// Chatbot lines starting with this are spoken into the microphone.
pub const SAY_PREFIX: &str = "say:";

async fn wait_for_gate(state: &PageState, gate: &'static str) -> Result<(), AppError> {
    let mut snapshots = state.subscribe();
    snapshots
        .wait_for(|snapshot| snapshot.gate(gate))
        .await
        .map_err(|_| AppError::PageClosed(gate))?;
    Ok(())
}

async fn next_navigation(
    navigations: &mut UnboundedReceiver<Navigation>,
) -> Result<Navigation, AppError> {
    navigations
        .recv()
        .await
        .ok_or(AppError::PageClosed("navigation"))
}

async fn landing(
    ctx: &PageContext,
    navigations: &mut UnboundedReceiver<Navigation>,
) -> Result<Navigation, AppError> {
    let page = LandingPage::mount(ctx);
    page.trigger_start()?;
    wait_for_gate(page.state(), NEXT_BUTTON_GATE).await?;
    page.press_next()?;
    next_navigation(navigations).await
}

async fn style_choose(
    ctx: &PageContext,
    style: StoryStyle,
    navigations: &mut UnboundedReceiver<Navigation>,
) -> Result<Navigation, AppError> {
    let page = StyleChoosePage::mount(ctx)?;
    wait_for_gate(page.state(), style.gate()).await?;
    page.choose(style)?;
    next_navigation(navigations).await
}

async fn chat<R>(
    ctx: &PageContext,
    config: &AppConfig,
    backend: Arc<dyn StoryBackend>,
    payload: Option<String>,
    lines: &mut Lines<R>,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
{
    let recognizer = Arc::new(ConsoleRecognizer::new());
    let services = ChatServices {
        backend,
        recognizer: Some(recognizer.clone()),
        notifier: Arc::new(ConsoleNotifier),
    };
    let settings = ChatSettings {
        user_id: config.user_id.clone(),
        recognition: RecognitionConfig {
            lang: config.voice.clone(),
            ..RecognitionConfig::default()
        },
    };
    let page = ChatPage::mount(ctx, services, settings, payload)?;
    let mut deliveries = page.deliveries();
    deliveries
        .wait_for(|sent| *sent >= 1)
        .await
        .map_err(|_| AppError::PageClosed("story input"))?;
    wait_for_gate(page.state(), SPEAK_BUTTON_GATE).await?;
    info!("speak button ready; each line is one utterance");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let expected = *deliveries.borrow() + 1;
        if !page.start_listening()? || !recognizer.hear(line) {
            continue;
        }
        deliveries
            .wait_for(|sent| *sent >= expected)
            .await
            .map_err(|_| AppError::PageClosed("transcript"))?;
    }
    Ok(())
}

/// Runs the story pages until `input` ends.
///
/// # Errors
///
/// Returns `AppError` if a page refuses an action or `input` fails.
#[instrument(skip_all, fields(style = %config.style))]
pub async fn run_story<R>(
    config: &AppConfig,
    backend: Arc<dyn StoryBackend>,
    audio: Arc<dyn AudioBackend>,
    input: R,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
{
    let (tx, mut navigations) = mpsc::unbounded_channel();
    let music = MusicProvider::new(audio.as_ref(), &ClipId::new(BACKGROUND_MUSIC));
    let ctx = PageContext {
        audio,
        music,
        navigator: Arc::new(ChannelNavigator::new(tx)),
        transitions: config.transitions,
    };
    let mut lines = input.lines();

    let mut next = Navigation {
        route: Route::Welcome,
        payload: None,
    };
    loop {
        info!(route = %next.route, "entering page");
        next = match next.route {
            Route::Welcome => landing(&ctx, &mut navigations).await?,
            Route::StyleChoose => style_choose(&ctx, config.style, &mut navigations).await?,
            Route::Chat => {
                return chat(&ctx, config, backend, next.payload, &mut lines).await;
            }
        };
    }
}

fn render(message: &ChatMessage) -> Option<String> {
    match (&message.sender, &message.body) {
        (Sender::User, _) => None,
        (Sender::Bot, MessageBody::Text(text)) => Some(format!("storyteller: {text}")),
        (Sender::Bot, MessageBody::Image(url)) => Some(format!("storyteller: [picture] {url}")),
    }
}

async fn write_new<W>(
    conversation: &Conversation,
    output: &mut W,
    shown: usize,
) -> Result<usize, AppError>
where
    W: AsyncWrite + Unpin,
{
    let messages = conversation.messages();
    for line in messages.iter().skip(shown).filter_map(render) {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }
    output.flush().await?;
    Ok(messages.len())
}

/// Records `spoken` through the microphone and returns the recognized draft.
async fn dictate(
    voice: &VoiceInput,
    recognizer: &ConsoleRecognizer,
    spoken: &str,
) -> Result<Option<String>, AppError> {
    if !voice.toggle()? || !recognizer.hear(spoken) {
        return Ok(None);
    }
    voice
        .subscribe()
        .wait_for(|draft| !draft.recording)
        .await
        .map_err(|_| AppError::PageClosed("microphone"))?;
    Ok(Some(voice.take_draft()))
}

/// Runs the chatbot until `input` ends, writing storyteller messages to
/// `output`. Lines starting with [`EXPLAIN_PREFIX`] ask for a word
/// explanation; lines starting with [`SAY_PREFIX`] go through the
/// microphone.
///
/// # Errors
///
/// Returns `AppError::Io` if reading `input` or writing `output` fails and
/// `AppError::Sequencer` if the microphone is unavailable.
#[instrument(skip_all, fields(voice = %config.voice))]
pub async fn run_chatbot<R, W>(
    config: &AppConfig,
    backend: Arc<dyn StoryBackend>,
    audio: Arc<dyn AudioBackend>,
    input: R,
    mut output: W,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let narration = Arc::new(NarrationPlayer::new(audio));
    let conversation = Conversation::new(
        backend,
        narration,
        Arc::new(SystemClock),
        config.voice.clone(),
    );

    let recognizer = Arc::new(ConsoleRecognizer::new());
    let voice = VoiceInput::new(Some(recognizer.clone()), Arc::new(ConsoleNotifier));

    conversation.welcome().await;
    let mut shown = write_new(&conversation, &mut output, 0).await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if let Some(word) = line.strip_prefix(EXPLAIN_PREFIX) {
            conversation.explain_word(word).await;
        } else if let Some(spoken) = line.strip_prefix(SAY_PREFIX) {
            if let Some(draft) = dictate(&voice, &recognizer, spoken).await? {
                conversation.send(&draft).await;
            }
        } else {
            conversation.send(line).await;
        }
        shown = write_new(&conversation, &mut output, shown).await?;
    }
    Ok(())
}
