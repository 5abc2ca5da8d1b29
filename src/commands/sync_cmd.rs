//! Sync CLI commands for sharing a trip through a room server.

use clap::{Args, Subcommand};
use std::io;
use std::time::Duration;
use tokio::time::timeout;

use triplog_core::sync::{SyncCoordinator, SyncOutcome, WsRoomStore};
use triplog_core::{check_server, AppData, AppState, Room, RoomStore, StorageError, SyncError};

use crate::config::Config;

use super::{confirm, load_state, summarize};

/// How long to wait for the room's first event after connecting.
const FIRST_EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Share trip data with a partner through a sync room
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: SyncSubcommand,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Create a new room seeded with your trip data
    Create,
    /// Join an existing room (its data replaces yours)
    Join {
        /// Room ID shared by your partner
        room_id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
    /// Show sync configuration, room and server status
    Status,
    /// Overwrite the room with your data
    Push,
    /// Ask your partner to accept your data
    Request,
    /// Accept your partner's pending request
    Accept,
    /// Reject your partner's pending request
    Reject,
    /// Follow room changes until interrupted
    Watch,
    /// Leave the room (the room itself is kept)
    Leave,
}

type Coordinator = SyncCoordinator<WsRoomStore>;

impl SyncCommand {
    pub fn run(&self, config: &Config) -> Result<(), SyncCommandError> {
        // Use tokio runtime for async operations
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| SyncCommandError::RuntimeError(e.to_string()))?;

        let mut state = load_state(config)?;

        match &self.command {
            SyncSubcommand::Create => rt.block_on(self.create(config, &mut state)),
            SyncSubcommand::Join { room_id, force } => {
                rt.block_on(self.join(config, &mut state, room_id, *force))
            }
            SyncSubcommand::Status => rt.block_on(self.status(config, &state)),
            SyncSubcommand::Push => rt.block_on(self.push(config, &state)),
            SyncSubcommand::Request => rt.block_on(self.request(config, &state)),
            SyncSubcommand::Accept => rt.block_on(self.answer(config, &mut state, true)),
            SyncSubcommand::Reject => rt.block_on(self.answer(config, &mut state, false)),
            SyncSubcommand::Watch => rt.block_on(self.watch(config, &mut state)),
            SyncSubcommand::Leave => self.leave(config, &state),
        }
    }

    async fn create(&self, config: &Config, state: &mut AppState) -> Result<(), SyncCommandError> {
        let mut coord = coordinator(config, state)?;
        let room_id = coord.create_room(state).await?;
        first_event(&mut coord, state).await?;

        println!("✓ Room created: {}", room_id);
        println!();
        println!("Share this room ID with your travel partner:");
        println!("  triplog sync join {}", room_id);
        Ok(())
    }

    async fn join(
        &self,
        config: &Config,
        state: &mut AppState,
        room_id: &str,
        force: bool,
    ) -> Result<(), SyncCommandError> {
        let mut coord = coordinator(config, state)?;

        let existing = coord.store().read_room(room_id).await.map_err(SyncError::from)?;
        if let Some(room) = existing.as_ref().filter(|r| join_replaces_data(r, state.data())) {
            let prompt = format!(
                "Room {} already has {}. Replace your {} with it?",
                room_id,
                summarize(&room.snapshot),
                summarize(state.data())
            );
            if !force && !confirm(&prompt)? {
                println!("Join cancelled.");
                return Ok(());
            }
        }

        coord.connect(state, room_id).await?;

        println!("✓ Joined room {}", room_id);
        match first_event(&mut coord, state).await? {
            Some(SyncOutcome::Applied { changed: true }) => {
                println!("Loaded room data: {}", summarize(state.data()));
            }
            Some(SyncOutcome::IncomingRequest(req)) => {
                print_incoming(&req.from_participant);
            }
            _ => println!("Your data already matches the room."),
        }
        Ok(())
    }

    async fn status(&self, config: &Config, state: &AppState) -> Result<(), SyncCommandError> {
        println!("Sync Status");
        println!("===========");
        println!();

        let participant = state.store().participant_id()?;
        let room_id = state.store().load_room_id()?;

        println!("Participant: {}", participant);
        println!("Room:        {}", room_id.as_deref().unwrap_or("(none)"));
        println!(
            "Local data:  {} [{}]",
            summarize(state.data()),
            state.data().fingerprint()
        );
        println!();

        let server_url = match config.sync.server_url.as_ref() {
            Some(url) => url,
            None => {
                println!("Server:      Not configured");
                println!();
                println!("To enable sync, add to your config file:");
                println!();
                println!("  sync:");
                println!("    server_url: \"ws://localhost:8080\"");
                println!();
                println!("Or set environment variable:");
                println!("  TRIPLOG_SYNC_URL");
                return Ok(());
            }
        };

        println!("Server:      {}", server_url);
        if !check_server(server_url).await {
            println!("Status:      ✗ unreachable");
            return Ok(());
        }
        println!("Status:      ✓ reachable");

        let room_id = match room_id {
            Some(id) => id,
            None => return Ok(()),
        };

        let store = WsRoomStore::new(server_url.clone());
        match store.read_room(&room_id).await.map_err(SyncError::from)? {
            Some(room) => {
                println!();
                println!("Room members: {}", room.members.join(", "));
                println!(
                    "Room data:    {} [{}]",
                    summarize(&room.snapshot),
                    room.snapshot.fingerprint()
                );
                println!("Updated:      {}", room.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
                if let Some(req) = &room.pending_request {
                    if req.from_participant == participant {
                        println!("Pending:      your request is waiting for your partner");
                    } else {
                        println!(
                            "Pending:      request from {} ({})",
                            req.from_participant,
                            summarize(&req.proposed_snapshot)
                        );
                    }
                }
            }
            None => println!("Room {} no longer exists on the server.", room_id),
        }
        Ok(())
    }

    async fn push(&self, config: &Config, state: &AppState) -> Result<(), SyncCommandError> {
        let (mut coord, room_id) = resume(config, state).await?;
        coord.direct_sync(state).await?;
        println!("✓ Pushed {} to room {}", summarize(state.data()), room_id);
        Ok(())
    }

    async fn request(&self, config: &Config, state: &AppState) -> Result<(), SyncCommandError> {
        let (mut coord, room_id) = resume(config, state).await?;
        coord.request_sync(state).await?;
        println!("✓ Sent sync request to room {}", room_id);
        println!("Your partner can accept it with 'triplog sync accept'.");
        Ok(())
    }

    async fn answer(
        &self,
        config: &Config,
        state: &mut AppState,
        accept: bool,
    ) -> Result<(), SyncCommandError> {
        let (mut coord, _) = resume(config, state).await?;

        match answer_request(&mut coord, state, accept).await? {
            None => println!("No sync request is waiting for an answer."),
            Some(_) if accept => {
                println!("✓ Accepted. Your data now has {}.", summarize(state.data()));
            }
            Some(_) => println!("✓ Rejected. Your data was not changed."),
        }
        Ok(())
    }

    async fn watch(&self, config: &Config, state: &mut AppState) -> Result<(), SyncCommandError> {
        let (mut coord, room_id) = resume(config, state).await?;
        println!("Watching room {} (Ctrl-C to stop)...", room_id);

        loop {
            tokio::select! {
                event = coord.next_event() => {
                    let event = match event {
                        Some(event) => event,
                        None => {
                            println!("Subscription closed.");
                            return Ok(());
                        }
                    };
                    match coord.handle_event(state, event)? {
                        SyncOutcome::Applied { changed: true } => {
                            println!("Room updated: {}", summarize(state.data()));
                        }
                        SyncOutcome::Applied { changed: false } | SyncOutcome::Unchanged => {
                            tracing::debug!("Room event with no data change");
                        }
                        SyncOutcome::IncomingRequest(req) => print_incoming(&req.from_participant),
                        SyncOutcome::Ignored => {}
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    println!("Stopped watching.");
                    return Ok(());
                }
            }
        }
    }

    fn leave(&self, config: &Config, state: &AppState) -> Result<(), SyncCommandError> {
        let room_id = state.store().load_room_id()?;
        let mut coord = coordinator(config, state)?;
        coord.disconnect(state)?;

        match room_id {
            Some(id) => println!("✓ Left room {}", id),
            None => println!("Not in a room."),
        }
        Ok(())
    }
}

fn coordinator(config: &Config, state: &AppState) -> Result<Coordinator, SyncCommandError> {
    let server_url = config
        .sync
        .server_url
        .as_ref()
        .ok_or(SyncCommandError::NotConfigured)?;
    let participant = state.store().participant_id()?;
    Ok(SyncCoordinator::new(
        WsRoomStore::new(server_url.clone()),
        participant,
    ))
}

/// Reconnects to the saved room.
async fn resume(
    config: &Config,
    state: &AppState,
) -> Result<(Coordinator, String), SyncCommandError> {
    let mut coord = coordinator(config, state)?;
    match coord.resume(state).await? {
        Some(room_id) => Ok((coord, room_id)),
        None => Err(SyncCommandError::NotInRoom),
    }
}

/// Handles the room's first event, which carries the current room.
async fn first_event(
    coord: &mut Coordinator,
    state: &mut AppState,
) -> Result<Option<SyncOutcome>, SyncCommandError> {
    match timeout(FIRST_EVENT_TIMEOUT, coord.next_event()).await {
        Ok(Some(event)) => Ok(Some(coord.handle_event(state, event)?)),
        Ok(None) => Ok(None),
        Err(_) => {
            tracing::warn!("No room event within {:?}", FIRST_EVENT_TIMEOUT);
            Ok(None)
        }
    }
}

/// Whether joining a room that already exists would overwrite local data.
fn join_replaces_data(room: &Room, local: &AppData) -> bool {
    room.snapshot != *local
}

/// Answers the waiting request without ever applying the room snapshot.
///
/// Returns `None` when no request is waiting, otherwise whether local data
/// changed.
async fn answer_request<S: RoomStore>(
    coord: &mut SyncCoordinator<S>,
    state: &mut AppState,
    accept: bool,
) -> Result<Option<bool>, SyncError> {
    if coord.check_request().await?.is_none() {
        return Ok(None);
    }

    if accept {
        coord.accept_sync(state).await.map(Some)
    } else {
        coord.reject_sync().await?;
        Ok(Some(false))
    }
}

fn print_incoming(from: &str) {
    println!("! {} wants to replace your trip data with theirs.", from);
    println!("  Run 'triplog sync accept' or 'triplog sync reject'.");
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    SyncError(SyncError),
    StorageError(StorageError),
    IoError(io::Error),
    RuntimeError(String),
    NotConfigured,
    NotInRoom,
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::SyncError(e) => write!(f, "{}", e),
            SyncCommandError::StorageError(e) => write!(f, "{}", e),
            SyncCommandError::IoError(e) => write!(f, "IO error: {}", e),
            SyncCommandError::RuntimeError(e) => write!(f, "Runtime error: {}", e),
            SyncCommandError::NotConfigured => write!(
                f,
                "Sync not configured. Add sync.server_url to config or set TRIPLOG_SYNC_URL."
            ),
            SyncCommandError::NotInRoom => write!(
                f,
                "Not in a room. Use 'triplog sync create' or 'triplog sync join <room>'."
            ),
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::SyncError(e) => Some(e),
            SyncCommandError::StorageError(e) => Some(e),
            SyncCommandError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyncError> for SyncCommandError {
    fn from(e: SyncError) -> Self {
        SyncCommandError::SyncError(e)
    }
}

impl From<StorageError> for SyncCommandError {
    fn from(e: StorageError) -> Self {
        SyncCommandError::StorageError(e)
    }
}

impl From<io::Error> for SyncCommandError {
    fn from(e: io::Error) -> Self {
        SyncCommandError::IoError(e)
    }
}
