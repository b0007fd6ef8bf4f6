//! Chatbot conversation: a narrated, illustrated transcript.
//!
//! The first exchanges go to `/start`, where the storyteller gets to know the
//! child. Once a reply announces the story, later messages go to `/chat`.
//! Bot replies are narrated through the shared [`NarrationPlayer`] and any
//! keywords in a reply are turned into an illustration.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use storyteller_backend::StoryBackend;
use storyteller_backend::dto::{TtsResponse, WordExplanation};
use storyteller_core::audio::ClipId;
use storyteller_core::clock::Clock;
use storyteller_sequencer::application::scope::TaskScope;
use tracing::{debug, error, info, instrument, warn};

use crate::narration::NarrationPlayer;

/// First storyteller message of every conversation.
pub const WELCOME_MESSAGE: &str = "Hello, kid! Please introduce yourself. What's your name? \
     How old are you? And what kind of stories do you like?";

/// A reply containing this marks the end of the introduction.
pub const STORY_STARTED_MARKER: &str = "Lets start the story";

/// How long the welcome button charges before the welcome message appears.
pub const CHARGING_DELAY: Duration = Duration::from_millis(1500);
/// Delay before a reply is narrated.
pub const REPLY_NARRATION_DELAY: Duration = Duration::from_millis(300);
/// Word explanations are always narrated in this voice.
pub const WORD_VOICE: &str = "en-US";

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// Message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    /// URL of an illustration.
    Image(String),
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub body: MessageBody,
    /// When the message entered the transcript.
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Transcript {
    messages: Vec<ChatMessage>,
    story_started: bool,
    charging: bool,
    input_visible: bool,
}

async fn narrate(backend: &dyn StoryBackend, narration: &NarrationPlayer, text: &str, voice: &str) {
    match backend.tts(text, voice).await {
        Ok(TtsResponse {
            audio_url: Some(url),
        }) => narration.play(&ClipId::new(url)),
        Ok(_) => warn!("speech synthesis returned no audio"),
        Err(e) => error!(error = %e, "speech synthesis failed"),
    }
}

/// A chatbot conversation.
pub struct Conversation {
    backend: Arc<dyn StoryBackend>,
    narration: Arc<NarrationPlayer>,
    clock: Arc<dyn Clock>,
    voice: String,
    transcript: Mutex<Transcript>,
    scope: TaskScope,
}

impl Conversation {
    /// Creates an empty conversation narrated in `voice`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn StoryBackend>,
        narration: Arc<NarrationPlayer>,
        clock: Arc<dyn Clock>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            narration,
            clock,
            voice: voice.into(),
            transcript: Mutex::new(Transcript::default()),
            scope: TaskScope::new(),
        }
    }

    fn transcript(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn message(&self, sender: Sender, body: MessageBody) -> ChatMessage {
        ChatMessage {
            sender,
            body,
            sent_at: self.clock.now(),
        }
    }

    fn push(&self, sender: Sender, body: MessageBody) {
        let message = self.message(sender, body);
        self.transcript().messages.push(message);
    }

    /// Charges for [`CHARGING_DELAY`], then replaces the transcript with the
    /// welcome message and narrates it.
    pub async fn welcome(&self) {
        self.transcript().charging = true;
        tokio::time::sleep(CHARGING_DELAY).await;
        let welcome = self.message(Sender::Bot, MessageBody::Text(WELCOME_MESSAGE.to_owned()));
        {
            let mut transcript = self.transcript();
            transcript.charging = false;
            transcript.input_visible = true;
            transcript.messages = vec![welcome];
        }
        narrate(self.backend.as_ref(), &self.narration, WELCOME_MESSAGE, &self.voice).await;
    }

    /// Sends a user message and records the reply. Blank input is ignored
    /// and returns `false`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[instrument(skip_all)]
    pub async fn send(&self, input: &str) -> bool {
        let text = input.trim();
        if text.is_empty() {
            return false;
        }
        self.push(Sender::User, MessageBody::Text(text.to_owned()));

        let started = self.is_story_started();
        let result = if started {
            self.backend.chat(text).await
        } else {
            self.backend.start(text).await
        };
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "message was not delivered");
                return true;
            }
        };
        if let Some(reason) = reply.error {
            error!(reason = %reason, "storyteller reported an error");
            return true;
        }

        if let Some(text) = reply.reply.as_deref() {
            self.push(Sender::Bot, MessageBody::Text(text.to_owned()));
            self.narrate_later(text.to_owned());
        }
        if let Some(keywords) = reply.keywords.as_deref().filter(|k| !k.trim().is_empty()) {
            self.illustrate(keywords).await;
        }
        if !started
            && reply
                .reply
                .as_deref()
                .is_some_and(|r| r.contains(STORY_STARTED_MARKER))
        {
            self.transcript().story_started = true;
            info!("introduction finished; story started");
        }
        true
    }

    fn narrate_later(&self, text: String) {
        let backend = Arc::clone(&self.backend);
        let narration = Arc::clone(&self.narration);
        let voice = self.voice.clone();
        self.scope.spawn(async move {
            tokio::time::sleep(REPLY_NARRATION_DELAY).await;
            narrate(backend.as_ref(), &narration, &text, &voice).await;
        });
    }

    async fn illustrate(&self, keywords: &str) {
        debug!(keywords, "requesting illustration");
        match self.backend.generate_image(keywords).await {
            Ok(response) => match response.image_url {
                Some(url) => self.push(Sender::Bot, MessageBody::Image(url)),
                None => warn!("illustration response had no image"),
            },
            Err(e) => error!(error = %e, "illustration failed"),
        }
    }

    /// Asks for a child-friendly explanation of `word`. Returns `true` if one
    /// was added to the transcript.
    #[instrument(skip(self))]
    pub async fn explain_word(&self, word: &str) -> bool {
        let word = word.trim();
        if word.is_empty() {
            return false;
        }
        match self.backend.explain_word(word).await {
            Ok(WordExplanation {
                definition: Some(definition),
                pronunciation: Some(pronunciation),
            }) => {
                self.push(
                    Sender::Bot,
                    MessageBody::Text(format!(
                        "{word}: {definition} (pronunciation: {pronunciation})"
                    )),
                );
                let spoken = format!("{word}, {definition}");
                narrate(self.backend.as_ref(), &self.narration, &spoken, WORD_VOICE).await;
                true
            }
            Ok(_) => {
                debug!("explanation incomplete");
                false
            }
            Err(e) => {
                error!(error = %e, "word explanation failed");
                false
            }
        }
    }

    /// Snapshot of the transcript.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.transcript().messages.clone()
    }

    /// Whether messages now go to `/chat`.
    #[must_use]
    pub fn is_story_started(&self) -> bool {
        self.transcript().story_started
    }

    #[must_use]
    pub fn is_charging(&self) -> bool {
        self.transcript().charging
    }

    /// Whether the message input has been revealed.
    #[must_use]
    pub fn is_input_visible(&self) -> bool {
        self.transcript().input_visible
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("voice", &self.voice)
            .field("transcript", &*self.transcript())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use storyteller_backend::dto::ChatReply;
    use storyteller_test_support::{
        BackendCall, FailingBackend, FakeAudioBackend, FixedClock, ScriptedBackend, settle,
    };

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    fn reply(text: &str) -> ChatReply {
        ChatReply {
            reply: Some(text.to_owned()),
            ..ChatReply::default()
        }
    }

    struct Fixture {
        backend: Arc<ScriptedBackend>,
        audio: Arc<FakeAudioBackend>,
        conversation: Conversation,
    }

    fn fixture(backend: ScriptedBackend) -> Fixture {
        let backend = Arc::new(backend);
        let audio = Arc::new(FakeAudioBackend::new());
        let narration = Arc::new(NarrationPlayer::new(audio.clone()));
        let conversation =
            Conversation::new(backend.clone(), narration, Arc::new(FixedClock(at())), "en-GB");
        Fixture {
            backend,
            audio,
            conversation,
        }
    }

    fn chat_calls(backend: &ScriptedBackend) -> Vec<BackendCall> {
        backend
            .calls()
            .into_iter()
            .filter(|call| matches!(call, BackendCall::Start(_) | BackendCall::Chat(_)))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_welcome_charges_then_narrates_greeting() {
        // Arrange
        let f = fixture(ScriptedBackend::new().with_audio_url("http://tts/welcome.mp3"));

        // Act
        let ((), charging_midway) = tokio::join!(f.conversation.welcome(), async {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            f.conversation.is_charging()
        });
        tokio::time::sleep(Duration::from_millis(300)).await;

        // Assert
        assert!(charging_midway);
        assert!(!f.conversation.is_charging());
        assert!(f.conversation.is_input_visible());
        assert_eq!(
            f.conversation.messages(),
            vec![ChatMessage {
                sender: Sender::Bot,
                body: MessageBody::Text(WELCOME_MESSAGE.to_owned()),
                sent_at: at(),
            }]
        );
        assert_eq!(
            f.backend.calls(),
            vec![BackendCall::Tts(WELCOME_MESSAGE.to_owned(), "en-GB".to_owned())]
        );
        assert_eq!(
            f.audio.handle("http://tts/welcome.mp3").unwrap().play_count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_switch_to_chat_after_story_starts() {
        // Arrange
        let f = fixture(ScriptedBackend::new().with_replies(vec![
            reply("Nice to meet you, Mia!"),
            reply("Great. Lets start the story about a brave puppy."),
            reply("Once upon a time..."),
        ]));

        // Act
        f.conversation.send("I'm Mia, I'm 6").await;
        let started_after_first = f.conversation.is_story_started();
        f.conversation.send("I like puppies").await;
        f.conversation.send("What happens next?").await;

        // Assert
        assert!(!started_after_first);
        assert!(f.conversation.is_story_started());
        assert_eq!(
            chat_calls(&f.backend),
            vec![
                BackendCall::Start("I'm Mia, I'm 6".to_owned()),
                BackendCall::Start("I like puppies".to_owned()),
                BackendCall::Chat("What happens next?".to_owned()),
            ]
        );
        assert_eq!(f.conversation.messages().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_input_is_ignored() {
        let f = fixture(ScriptedBackend::new());

        let sent = f.conversation.send("   ").await;

        assert!(!sent);
        assert!(f.backend.calls().is_empty());
        assert!(f.conversation.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_is_narrated_after_delay() {
        // Arrange
        let f = fixture(
            ScriptedBackend::new()
                .with_replies(vec![reply("Hello Mia")])
                .with_audio_url("http://tts/reply.mp3"),
        );

        // Act
        f.conversation.send("hi").await;
        tokio::time::sleep(Duration::from_millis(299)).await;
        settle().await;
        let tts_before = f.backend.calls().len();
        tokio::time::sleep(Duration::from_millis(1)).await;
        settle().await;

        // Assert
        assert_eq!(tts_before, 1);
        assert_eq!(
            f.backend.calls().last(),
            Some(&BackendCall::Tts("Hello Mia".to_owned(), "en-GB".to_owned()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_keywords_add_illustration() {
        let f = fixture(
            ScriptedBackend::new()
                .with_replies(vec![ChatReply {
                    reply: Some("A puppy ran to the hill.".to_owned()),
                    keywords: Some("puppy, hill".to_owned()),
                    error: None,
                }])
                .with_image_url("http://img/puppy.png"),
        );

        f.conversation.send("go on").await;

        let messages = f.conversation.messages();
        assert_eq!(
            messages.last().map(|m| &m.body),
            Some(&MessageBody::Image("http://img/puppy.png".to_owned()))
        );
        assert!(
            f.backend
                .calls()
                .contains(&BackendCall::GenerateImage("puppy, hill".to_owned()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_error_ends_turn() {
        let f = fixture(ScriptedBackend::new().with_replies(vec![ChatReply {
            reply: Some("Lets start the story".to_owned()),
            keywords: Some("castle".to_owned()),
            error: Some("model overloaded".to_owned()),
        }]));

        f.conversation.send("hello").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(f.conversation.messages().len(), 1);
        assert!(!f.conversation.is_story_started());
        assert_eq!(f.backend.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_backend_keeps_user_message() {
        let audio = Arc::new(FakeAudioBackend::new());
        let conversation = Conversation::new(
            Arc::new(FailingBackend),
            Arc::new(NarrationPlayer::new(audio)),
            Arc::new(FixedClock(at())),
            "en-US",
        );

        let sent = conversation.send("hello").await;

        assert!(sent);
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].sender, Sender::User);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explain_word_formats_and_narrates_in_english() {
        // Arrange
        let f = fixture(
            ScriptedBackend::new()
                .with_explanation("a big round orange vegetable", "PUMP-kin")
                .with_audio_url("http://tts/word.mp3"),
        );

        // Act
        let explained = f.conversation.explain_word("pumpkin").await;

        // Assert
        assert!(explained);
        assert_eq!(
            f.conversation.messages()[0].body,
            MessageBody::Text(
                "pumpkin: a big round orange vegetable (pronunciation: PUMP-kin)".to_owned()
            )
        );
        assert_eq!(
            f.backend.calls(),
            vec![
                BackendCall::ExplainWord("pumpkin".to_owned()),
                BackendCall::Tts(
                    "pumpkin, a big round orange vegetable".to_owned(),
                    WORD_VOICE.to_owned()
                ),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_incomplete_explanation_is_dropped() {
        let f = fixture(ScriptedBackend::new());

        let explained = f.conversation.explain_word("castle").await;

        assert!(!explained);
        assert!(f.conversation.messages().is_empty());
    }
}
