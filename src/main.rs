use clap::{Parser, Subcommand};
use reverie::audio::AudioSource;
use reverie::config::Settings;
use reverie::journal::DreamJournal;
use reverie::pipeline::{DreamDraft, DreamPipeline, PipelineError};
use reverie::probe;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "reverie", version, about = "Voice-recorded dream journal")]
struct Cli {
    /// Directory for the journal and saved media
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check which providers are reachable
    Status,
    /// Run the pipeline on an audio file
    Submit {
        /// Path to a .wav or .mp3 file
        file: PathBuf,
        /// Store the dream in the journal when the run completes
        #[arg(long)]
        save: bool,
        /// Title for the saved dream
        #[arg(long)]
        title: Option<String>,
    },
    /// Record from the microphone and run the pipeline
    #[cfg(feature = "capture")]
    Record {
        /// Recording duration in seconds
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=300))]
        seconds: u64,
        /// Store the dream in the journal when the run completes
        #[arg(long)]
        save: bool,
        /// Title for the saved dream
        #[arg(long)]
        title: Option<String>,
    },
    /// List stored dreams, newest first
    List {
        /// Maximum number of dreams to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete one dream by id
    Delete { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env();
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    match run(cli.command, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Status => {
            let pipeline =
                DreamPipeline::from_settings(&settings, Arc::new(DreamJournal::in_memory()));
            let status = probe::probe_capabilities(
                pipeline.transcription_stage(),
                pipeline.emotion_stage(),
                pipeline.image_stage(),
            )
            .await;

            for (name, up) in status.as_entries() {
                println!("{:<14} {}", name, if up { "available" } else { "unavailable" });
            }
            Ok(())
        }

        Command::Submit { file, save, title } => {
            let audio = AudioSource::from_file(&file)?;
            let journal = Arc::new(DreamJournal::new(settings.data_dir.clone())?);
            let pipeline = DreamPipeline::from_settings(&settings, journal);

            let draft = run_with_progress(&pipeline, audio).await?;
            print_draft(&draft);
            finish(&pipeline, save, title)?;
            Ok(())
        }

        #[cfg(feature = "capture")]
        Command::Record {
            seconds,
            save,
            title,
        } => {
            let journal = Arc::new(DreamJournal::new(settings.data_dir.clone())?);
            let pipeline = DreamPipeline::from_settings(&settings, journal);

            println!("Recording for {} seconds...", seconds);
            let duration = std::time::Duration::from_secs(seconds);
            let wav =
                tokio::task::spawn_blocking(move || reverie::capture::record_for(duration))
                    .await??;

            let draft = run_with_progress(&pipeline, AudioSource::from_capture(wav)).await?;
            print_draft(&draft);
            finish(&pipeline, save, title)?;
            Ok(())
        }

        Command::List { limit } => {
            let journal = DreamJournal::new(settings.data_dir.clone())?;
            let dreams = journal.get_all(limit)?;
            if dreams.is_empty() {
                println!("No dreams recorded yet.");
            } else {
                for dream in dreams {
                    println!(
                        "{}  {} {}  {}",
                        dream.id,
                        dream.emotion.glyph(),
                        dream.display_title(),
                        dream.created_at.format("%Y-%m-%d %H:%M"),
                    );
                }
            }
            Ok(())
        }

        Command::Delete { id } => {
            let journal = DreamJournal::new(settings.data_dir.clone())?;
            if journal.delete(&id)? {
                println!("Deleted dream {}", id);
                Ok(())
            } else {
                Err(format!("no dream with id {}", id).into())
            }
        }
    }
}

/// Submit audio while streaming step progress to stdout
async fn run_with_progress(
    pipeline: &DreamPipeline,
    audio: AudioSource,
) -> Result<DreamDraft, PipelineError> {
    let mut rx = pipeline.subscribe();
    let progress = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            if state.is_processing() {
                println!("[{}/3] {}...", state.completed_steps() + 1, state);
            }
        }
    });

    let result = pipeline.submit(audio).await;
    progress.abort();
    result
}

fn print_draft(draft: &DreamDraft) {
    println!();
    println!("Transcription: {}", draft.transcription);
    println!("Emotion:       {} {}", draft.emotion, draft.emotion.glyph());
    println!("Image:         {}", draft.image_reference);
}

fn finish(
    pipeline: &DreamPipeline,
    save: bool,
    title: Option<String>,
) -> Result<(), PipelineError> {
    if save {
        let record = pipeline.save(title)?;
        println!("Saved dream {} ({})", record.id, record.display_title());
    } else {
        pipeline.discard()?;
        println!("Dream discarded; pass --save to keep it.");
    }
    Ok(())
}
