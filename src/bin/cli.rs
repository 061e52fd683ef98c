use anyhow::{bail, Context};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use unio_meet::config::MeetConfig;
use unio_meet::engine::ReportedParticipant;
use unio_meet::preferences::{resolve, suggest_display_name, Identity, PartialPreferences};
use unio_meet::session::{MeetingSessionController, SessionSnapshot};
use unio_meet::testing::FakeEngine;
use unio_meet::types::{ReactionKind, RoomName};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    unio_meet::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: unio-meet-cli <generate-room|suggest-name|resolve|simulate> [args] [--json]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "generate-room" => cmd_generate_room(),
        "suggest-name" => cmd_suggest_name(),
        "resolve" => cmd_resolve(&args),
        "simulate" => cmd_simulate(&args).await,
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn cmd_generate_room() -> anyhow::Result<()> {
    println!("{}", RoomName::generate());
    Ok(())
}

fn cmd_suggest_name() -> anyhow::Result<()> {
    println!("{}", suggest_display_name());
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> anyhow::Result<Option<&'a str>> {
    match args.iter().position(|a| a == flag) {
        Some(i) => match args.get(i + 1) {
            Some(value) => Ok(Some(value.as_str())),
            None => bail!("{} needs a value", flag),
        },
        None => Ok(None),
    }
}

fn cmd_resolve(args: &[String]) -> anyhow::Result<()> {
    // resolve [--registered <user_id>] [--email <email>] [--stored <json>] [--name <name>]
    //         [--audio-muted <bool>] [--video-muted <bool>] [--json]
    let identity = match flag_value(args, "--registered")? {
        Some(user_id) => Identity::Registered {
            user_id: user_id.to_string(),
            email: flag_value(args, "--email")?.map(str::to_string),
        },
        None => Identity::Anonymous,
    };
    let stored: Option<PartialPreferences> = flag_value(args, "--stored")?
        .map(serde_json::from_str)
        .transpose()
        .context("--stored must be a JSON preference document")?;
    let explicit = PartialPreferences {
        display_name: flag_value(args, "--name")?.map(str::to_string),
        avatar_url: flag_value(args, "--avatar")?.map(str::to_string),
        default_audio_muted: flag_value(args, "--audio-muted")?.map(str::parse).transpose()?,
        default_video_muted: flag_value(args, "--video-muted")?.map(str::parse).transpose()?,
    };

    let prefs = resolve(&identity, stored.as_ref(), stored.as_ref(), &explicit);
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string_pretty(&prefs)?);
    } else {
        println!("display name: {}", prefs.display_name);
        println!("avatar:       {}", prefs.avatar_url.as_deref().unwrap_or("-"));
        println!("audio muted:  {}", prefs.default_audio_muted);
        println!("video muted:  {}", prefs.default_video_muted);
        println!("tier:         {:?}", prefs.tier);
    }
    Ok(())
}

fn print_snapshot(step: &str, snapshot: &SessionSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(&serde_json::json!({ "step": step, "state": snapshot }))?
        );
        return Ok(());
    }
    let names: Vec<String> = snapshot
        .roster
        .iter()
        .map(|p| {
            if p.is_local {
                format!("{} (you)", p.display_name)
            } else {
                p.display_name.clone()
            }
        })
        .collect();
    println!(
        "{:<14} {:<12} audio_muted={} video_muted={} tile={} sharing={} roster=[{}]",
        step,
        snapshot.lifecycle,
        snapshot.controls.audio_muted,
        snapshot.controls.video_muted,
        snapshot.controls.tile_view_enabled,
        snapshot.controls.screen_sharing,
        names.join(", ")
    );
    Ok(())
}

async fn settle(session: &MeetingSessionController) -> SessionSnapshot {
    // The fake engine answers synchronously; give the event pump a moment.
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.snapshot()
}

async fn cmd_simulate(args: &[String]) -> anyhow::Result<()> {
    // simulate [--name <name>] [--room <room>] [--json]
    let json = args.contains(&"--json".to_string());
    let name = flag_value(args, "--name")?.unwrap_or("Luis").to_string();
    let room = match flag_value(args, "--room")? {
        Some(room) => RoomName::parse(room)?,
        None => RoomName::generate(),
    };

    let engine = FakeEngine::new();
    engine.echo_toggles().close_on_hangup();
    engine.set_mute_state(true, false);

    let session = MeetingSessionController::new(Arc::new(engine.clone()), &MeetConfig::default());
    session.on_session_end(|reason| log::info!("Session end callback: {:?}", reason));

    let explicit = PartialPreferences {
        display_name: Some(name.clone()),
        ..Default::default()
    };
    let prefs = resolve(&Identity::Anonymous, None, None, &explicit);
    session.start(room, &prefs).await?;
    print_snapshot("ready", &settle(&session).await, json)?;

    engine.set_participants(vec![ReportedParticipant::remote("p1", "Ana")]);
    engine.join("local-1", &name);
    print_snapshot("joined", &settle(&session).await, json)?;

    engine.add_participant("p2", "Marta");
    engine.add_participant("p2", "Marta");
    print_snapshot("p2 joined", &settle(&session).await, json)?;

    session.toggle_audio();
    session.toggle_tile_view();
    session.send_reaction(ReactionKind::Celebrate);
    print_snapshot("toggled", &settle(&session).await, json)?;

    engine.remove_participant("p1");
    print_snapshot("p1 left", &settle(&session).await, json)?;

    session.hang_up();
    print_snapshot("hung up", &settle(&session).await, json)?;

    if !json {
        let sent: Vec<&str> = engine.commands().iter().map(|c| c.name()).collect();
        println!("commands sent: {}", sent.join(", "));
    }
    Ok(())
}
