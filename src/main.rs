use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use campus_voice::api::ApiServerBuilder;
use campus_voice::client::{AssistantBackend, HttpBackend};
use campus_voice::gazetteer::{CampusLocation, maps_directions_url, search_location};
use campus_voice::navigation::{
    NavigationReply, QUICK_CATEGORIES, SUGGESTED_QUESTIONS, is_location_query, resolve_destination,
};
use campus_voice::providers::SarvamTts;
use campus_voice::speech_text::prepare_for_speech;
use campus_voice::transcript::{ChatMessage, MessageId, Role};
use campus_voice::voice::{
    AudioClip, CachedGeolocator, ControllerEvent, ControllerParts, CpalDevice, EventSender,
    Geolocator, MicCapture, NoCapture, Notice, NoticeLevel, OutputDevice, PlaybackEnd, Presenter,
    SpeechCapture, SpeechToText, VoiceController, VoiceState, samples_to_wav, select_strategy,
};
use campus_voice::{Config, Language};

/// Campus Voice - college assistant for LBS College of Engineering, Kasaragod
#[derive(Parser)]
#[command(name = "campus-voice", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve {
        /// Port to listen on
        #[arg(long, env = "CAMPUS_VOICE_PORT")]
        port: Option<u16>,
    },
    /// Interactive voice and text session against the gateway
    Chat,
    /// Ask a single question through the gateway
    Ask {
        /// Question to ask
        question: String,
        /// Speak the answer
        #[arg(short, long)]
        speak: bool,
    },
    /// Look up a campus location
    Locate {
        /// Place to find, e.g. "canteen" or "ladies hostel"
        query: String,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test Sarvam TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! Welcome to LBS College of Engineering, Kasaragod.")]
        text: String,
        /// Target language code
        #[arg(short, long, default_value = "en-IN")]
        language: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,campus_voice=info",
        1 => "info,campus_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load();
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(config, port).await,
        Command::Chat => chat(config).await,
        Command::Ask { question, speak } => ask(&config, &question, speak).await,
        Command::Locate { query } => locate(&config, &query).await,
        Command::TestSpeaker => test_speaker(&config).await,
        Command::TestTts { text, language } => test_tts(config, &text, &language).await,
    }
}

/// Run the gateway until interrupted
async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    if config.api_keys.chat.is_none() {
        tracing::warn!("CHAT_API_KEY is not set, /college-chat will fail");
    }
    if config.api_keys.sarvam.is_none() {
        tracing::warn!("SARVAM_API_KEY is not set, /sarvam-tts will fail");
    }

    let mut builder = ApiServerBuilder::new(config);
    if let Some(port) = port {
        builder = builder.port(port);
    }

    tokio::select! {
        result = builder.build().run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}

/// Prints controller output to the terminal
struct TerminalPresenter {
    /// Assistant messages in display order, for `/play N`
    spoken: Arc<Mutex<Vec<MessageId>>>,
}

impl Presenter for TerminalPresenter {
    fn state_changed(&mut self, state: VoiceState) {
        if state != VoiceState::Idle {
            println!("  [{state}]");
        }
    }

    fn message_appended(&mut self, message: &ChatMessage) {
        match message.role {
            Role::User => println!("you> {}", message.content),
            Role::Assistant => {
                let Ok(mut spoken) = self.spoken.lock() else {
                    return;
                };
                spoken.push(message.id);
                println!("#{}> {}", spoken.len(), message.content);
                if let (Some(name), Some(link)) = (&message.location_name, &message.location_link) {
                    println!("     Open {name} in Google Maps: {link}");
                }
            }
        }
    }

    fn notice(&mut self, notice: &Notice) {
        let marker = match notice.level {
            NoticeLevel::Info => "i",
            NoticeLevel::Error => "!",
        };
        println!("  ({marker}) {}: {}", notice.title, notice.description);
    }

    fn playing_changed(&mut self, message: Option<MessageId>) {
        if message.is_some() {
            println!("  (speaking, /stop to interrupt)");
        }
    }
}

fn print_chat_help() {
    println!("Ask anything about LBS College of Engineering, Kasaragod.");
    println!("Press Enter on an empty line to talk, or type your question.\n");
    println!("Topics (/topic N):");
    for (i, (label, _)) in QUICK_CATEGORIES.iter().enumerate() {
        println!("  {}. {label}", i + 1);
    }
    println!("\nTry asking:");
    for question in SUGGESTED_QUESTIONS {
        println!("  - {question}");
    }
    println!("\nCommands: /play N, /stop, /topics, /quit\n");
}

/// Interactive session driven by the voice controller
async fn chat(mut config: Config) -> anyhow::Result<()> {
    let (events, rx) = campus_voice::voice::channel();

    let device: Arc<dyn OutputDevice> = Arc::new(CpalDevice::probe()?);
    let playback = select_strategy(config.voice.playback, device, &config.voice);

    let capture: Box<dyn SpeechCapture> = match config.api_keys.openai.take() {
        Some(key) => {
            let stt = SpeechToText::new(
                key,
                config.voice.stt_model.clone(),
                &config.voice.capture_locale,
            )?
            .with_timeout(config.voice.request_timeout);
            Box::new(MicCapture::new(stt))
        }
        None => {
            tracing::info!("OPENAI_API_KEY not set, voice input disabled");
            Box::new(NoCapture)
        }
    };

    let spoken = Arc::new(Mutex::new(Vec::new()));
    let parts = ControllerParts {
        backend: Arc::new(
            HttpBackend::new(config.server.gateway_url.clone())
                .with_timeout(config.voice.request_timeout),
        ),
        capture,
        playback,
        geolocator: Arc::new(CachedGeolocator::from_config(&config.geolocation)),
        presenter: Box::new(TerminalPresenter {
            spoken: spoken.clone(),
        }),
        teardown_grace: config.voice.teardown_grace,
    };
    let controller = VoiceController::new(parts, events.clone());

    tracing::info!(gateway = %config.server.gateway_url, "chat session started");
    print_chat_help();

    tokio::join!(controller.run(rx), read_commands(events, spoken));
    Ok(())
}

/// Turn stdin lines into controller events until `/quit` or EOF
async fn read_commands(events: EventSender, spoken: Arc<Mutex<Vec<MessageId>>>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read input");
                break;
            }
        };

        let line = line.trim();
        let event = match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => ControllerEvent::Tap,
            ("/quit" | "/exit", _) => break,
            ("/stop", _) => ControllerEvent::Stop,
            ("/topics" | "/help", _) => {
                print_chat_help();
                continue;
            }
            ("/topic", n) => match pick(QUICK_CATEGORIES, n) {
                Some((_, question)) => ControllerEvent::Submit((*question).to_string()),
                None => {
                    println!("  usage: /topic 1-{}", QUICK_CATEGORIES.len());
                    continue;
                }
            },
            ("/play", n) => {
                let id = spoken.lock().ok().and_then(|ids| match n.trim() {
                    "" => ids.last().copied(),
                    n => pick(&ids, n).copied(),
                });
                match id {
                    Some(id) => ControllerEvent::PlayMessage(id),
                    None => {
                        println!("  no such answer");
                        continue;
                    }
                }
            }
            _ => ControllerEvent::Submit(line.to_string()),
        };

        if !events.send(event) {
            return;
        }
    }

    events.send(ControllerEvent::Shutdown);
}

/// 1-based lookup from user input
fn pick<'a, T>(items: &'a [T], index: &str) -> Option<&'a T> {
    let n: usize = index.trim().parse().ok()?;
    items.get(n.checked_sub(1)?)
}

/// Ask one question and print the answer
async fn ask(config: &Config, question: &str, speak: bool) -> anyhow::Result<()> {
    let backend = HttpBackend::new(config.server.gateway_url.clone())
        .with_timeout(config.voice.request_timeout);

    let (text, language) = if is_location_query(question) {
        let geolocator = CachedGeolocator::from_config(&config.geolocation);
        let position = geolocator
            .locate()
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "no position"))
            .ok();
        let reply = NavigationReply::compose(resolve_destination(question), position);
        println!("{}", reply.display_text());
        println!(
            "Open {} in Google Maps: {}",
            reply.destination.name,
            maps_directions_url(reply.destination.coordinates, position)
        );
        (reply.spoken, Language::English)
    } else {
        let reply = backend.complete(question, &[]).await?;
        println!("{}", reply.response);
        tracing::debug!(language = %reply.detected_language, "answered");
        (reply.response, reply.detected_language)
    };

    if speak {
        let clip = backend.synthesize(&text, language).await?;
        play_clip(config, &clip).await?;
    }

    Ok(())
}

/// Describe a campus location and how far away it is
async fn locate(config: &Config, query: &str) -> anyhow::Result<()> {
    let Some(location) = search_location(query) else {
        anyhow::bail!("no campus location matches \"{query}\"");
    };

    let geolocator = CachedGeolocator::from_config(&config.geolocation);
    let position = match geolocator.locate().await {
        Ok(position) => Some(position),
        Err(e) => {
            println!("({e})");
            None
        }
    };

    print_location(location);
    let reply = NavigationReply::compose(location, position);
    println!("\n{}", reply.spoken);
    println!(
        "Directions: {}",
        maps_directions_url(location.coordinates, position)
    );

    Ok(())
}

fn print_location(location: &CampusLocation) {
    println!("{}", location.name);
    println!("  {}", location.description);
    println!("  Coordinates: {}", location.coordinates);
    println!("  Map: {}", location.maps_link);
}

/// Play a clip to completion through the configured strategy
async fn play_clip(config: &Config, clip: &AudioClip) -> anyhow::Result<()> {
    let device: Arc<dyn OutputDevice> = Arc::new(CpalDevice::probe()?);
    let mut playback = select_strategy(config.voice.playback, device, &config.voice);
    tracing::debug!(strategy = playback.name(), "playing clip");

    playback.unlock();
    let done = playback.start(clip).await?;
    let end = done.await;
    playback.stop();

    match end {
        Ok(PlaybackEnd::Completed) => Ok(()),
        Ok(PlaybackEnd::Failed(reason)) => anyhow::bail!("playback failed: {reason}"),
        Err(_) => anyhow::bail!("playback interrupted"),
    }
}

/// Test speaker output with a sine wave
async fn test_speaker(config: &Config) -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    let num_samples = sample_rate as usize * 2;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    let clip = AudioClip::from_bytes(samples_to_wav(&samples, sample_rate)?)?;
    play_clip(config, &clip).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Test Sarvam synthesis directly, without the gateway
async fn test_tts(mut config: Config, text: &str, language: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let processed = prepare_for_speech(text);
    println!("Processed: \"{processed}\"");

    let tts = SarvamTts::new(&config.upstream, config.api_keys.sarvam.take());

    println!("Synthesizing speech...");
    let audio = tts
        .synthesize(&processed, language)
        .await
        .map_err(|e| anyhow::anyhow!("TTS synthesis failed: {e}"))?;

    let clip = AudioClip::from_base64(&audio)?;
    println!("Got {} bytes of {:?} audio", clip.bytes().len(), clip.format());

    println!("Playing audio...");
    play_clip(&config, &clip).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
