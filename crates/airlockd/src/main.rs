//! airlockd - The airlock background service
//!
//! This is the main entry point for the airlockd service.
//! It wires together all the components:
//! - Configuration loading
//! - Audit log
//! - Session manager (with orphan recovery at startup)
//! - Host collaborators (Linux)
//! - IPC server
//! - Inactivity watch

use airlock_api::{
    ClientInfo, Command, ErrorCode, ErrorInfo, Event, EventPayload, Response, ResponsePayload,
    SessionEndReason,
};
use airlock_config::load_config_or_default;
use airlock_core::{spawn_inactivity_watch, CoreEvent, SessionManager, SessionSettings};
use airlock_host_api::HostServices;
use airlock_host_linux::{LpPrintSpooler, ScanimageScanner, UnixIsolator};
use airlock_ipc::{IpcServer, ServerMessage};
use airlock_store::{AuditEvent, AuditSink, FileAuditLog};
use airlock_util::{default_config_path, sessions_root_in, AirlockError, ClientId};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// airlockd - Ephemeral secure document sessions
#[derive(Parser, Debug)]
#[command(name = "airlockd")]
#[command(about = "Ephemeral, isolated document sessions with secure teardown", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/airlock/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set AIRLOCK_SOCKET env var)
    #[arg(short, long, env = "AIRLOCK_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set AIRLOCK_DATA_DIR env var)
    #[arg(short, long, env = "AIRLOCK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    manager: Arc<SessionManager>,
    ipc: Arc<IpcServer>,
    audit: Arc<dyn AuditSink>,
    core_events: mpsc::UnboundedReceiver<CoreEvent>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(config_path = %args.config.display(), "Configuration loaded");

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| config.service.socket_path.clone());

        let sessions_root = match &args.data_dir {
            Some(data_dir) => sessions_root_in(data_dir),
            None => config.sessions.root.clone(),
        };

        let audit: Arc<dyn AuditSink> = Arc::new(
            FileAuditLog::open(&config.audit.log_path).with_context(|| {
                format!("Failed to open audit log {:?}", config.audit.log_path)
            })?,
        );

        info!(log_path = %config.audit.log_path.display(), "Audit log initialized");

        audit.record(&AuditEvent::ServiceStarted)?;

        let host = HostServices::new(
            Arc::new(UnixIsolator::new()),
            Arc::new(ScanimageScanner::new(
                config.scan.device.clone(),
                config.scan.format.as_arg(),
                config.scan.format.extension(),
            )),
            Arc::new(LpPrintSpooler::new(config.print.printer.clone())),
        );

        let settings = SessionSettings::new(sessions_root, config.sessions.inactivity_timeout)
            .with_check_interval(config.sessions.check_interval)
            .with_chunk_size(config.wipe.chunk_size);

        // Construction wipes orphans left by a previous run
        let manager_audit = audit.clone();
        let manager = tokio::task::spawn_blocking(move || {
            SessionManager::new(settings, manager_audit, host)
        })
        .await
        .context("Session manager initialization panicked")?
        .context("Failed to initialize session manager")?;
        let manager = Arc::new(manager);

        let (event_tx, core_events) = mpsc::unbounded_channel();
        manager.subscribe(Arc::new(move |event: &CoreEvent| {
            let _ = event_tx.send(event.clone());
        }));

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        Ok(Self {
            manager,
            ipc: Arc::new(ipc),
            audit,
            core_events,
        })
    }

    async fn run(self) -> Result<()> {
        let Service {
            manager,
            ipc,
            audit,
            mut core_events,
        } = self;

        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let watch = spawn_inactivity_watch(manager.clone());

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                Some(event) = core_events.recv() => {
                    ipc.broadcast_event(Event::new(EventPayload::from(event)));
                }

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&manager, &ipc, msg).await;
                }
            }
        }

        info!("Shutting down airlockd");
        watch.abort();

        let shutdown_manager = manager.clone();
        match tokio::task::spawn_blocking(move || shutdown_manager.shutdown()).await {
            Ok(Some(outcome)) => info!(
                success = outcome.success,
                files_destroyed = outcome.files_destroyed,
                "Active session ended at shutdown"
            ),
            Ok(None) => {}
            Err(e) => error!(error = %e, "Session shutdown panicked"),
        }

        if let Err(e) = audit.record(&AuditEvent::ServiceStopped) {
            warn!(error = %e, "Failed to log service shutdown");
        }

        ipc.shutdown();
        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(manager: &Arc<SessionManager>, ipc: &Arc<IpcServer>, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let info = ipc.get_client_info(&client_id).await;
                let response =
                    Self::handle_command(manager, &client_id, info, request.request_id, request.command)
                        .await;

                let _ = ipc.send_response(&client_id, response).await;
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");
            }
        }
    }

    async fn handle_command(
        manager: &Arc<SessionManager>,
        client_id: &ClientId,
        info: Option<ClientInfo>,
        request_id: u64,
        command: Command,
    ) -> Response {
        if command.is_control() && !info.as_ref().is_some_and(|i| i.role.can_control()) {
            warn!(client_id = %client_id, command = ?command, "Control command from observer");
            return Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::PermissionDenied, "Observers cannot control sessions"),
            );
        }

        let result = match command {
            Command::GetState => {
                blocking(manager, |m| Ok(ResponsePayload::State(m.snapshot()))).await
            }

            Command::StartSession => {
                blocking(manager, |m| m.start_new_session().map(ResponsePayload::SessionStarted))
                    .await
            }

            Command::EndSession { reason } => {
                if reason == SessionEndReason::CrashRecovery {
                    Err(AirlockError::invalid_input(
                        "crash recovery is reserved for startup",
                    ))
                } else {
                    blocking(manager, move |m| {
                        m.end_session(reason);
                        Ok(ResponsePayload::SessionEnded)
                    })
                    .await
                }
            }

            Command::NotifyInteraction => {
                blocking(manager, |m| {
                    m.notify_user_interaction();
                    Ok(ResponsePayload::InteractionNoted)
                })
                .await
            }

            Command::ImportFile { source } => {
                blocking(manager, move |m| m.import_file(&source).map(ResponsePayload::FileAdded))
                    .await
            }

            Command::ScanDocument => {
                blocking(manager, |m| m.scan_document().map(ResponsePayload::FileAdded)).await
            }

            Command::PrintFile { name } => {
                blocking(manager, move |m| m.print_file(&name).map(|()| ResponsePayload::Printed))
                    .await
            }

            Command::GetFiles => {
                blocking(manager, |m| {
                    Ok(ResponsePayload::Files {
                        files: m.get_session_files(),
                    })
                })
                .await
            }

            Command::GetLog => {
                blocking(manager, |m| m.get_log().map(|text| ResponsePayload::Log { text })).await
            }

            Command::SubscribeEvents => Ok(ResponsePayload::Subscribed {
                client_id: client_id.clone(),
            }),

            Command::UnsubscribeEvents => Ok(ResponsePayload::Unsubscribed),

            Command::Ping => Ok(ResponsePayload::Pong),
        };

        match result {
            Ok(payload) => Response::success(request_id, payload),
            Err(e) => {
                if e.is_precondition() {
                    debug!(error = %e, "Command rejected");
                } else {
                    warn!(error = %e, "Command failed");
                }
                Response::error(request_id, error_info(&e))
            }
        }
    }
}

/// Run a manager call on the blocking pool; the manager does filesystem work
/// under its lock
async fn blocking<F>(manager: &Arc<SessionManager>, f: F) -> airlock_util::Result<ResponsePayload>
where
    F: FnOnce(&SessionManager) -> airlock_util::Result<ResponsePayload> + Send + 'static,
{
    let manager = manager.clone();
    tokio::task::spawn_blocking(move || f(&manager))
        .await
        .unwrap_or_else(|e| Err(AirlockError::internal(format!("task failed: {}", e))))
}

fn error_info(e: &AirlockError) -> ErrorInfo {
    let code = match e {
        AirlockError::NoActiveSession => ErrorCode::NoActiveSession,
        AirlockError::SessionAlreadyActive => ErrorCode::SessionActive,
        AirlockError::SecurityPolicy(_) => ErrorCode::SecurityPolicy,
        AirlockError::Unauthorized(_) => ErrorCode::Unauthorized,
        AirlockError::InvalidInput(_) | AirlockError::Io(_) => ErrorCode::InvalidRequest,
        AirlockError::HostError(_) => ErrorCode::HostError,
        AirlockError::ConfigError(_) | AirlockError::StoreError(_) | AirlockError::Internal(_) => {
            ErrorCode::InternalError
        }
    };
    ErrorInfo::new(code, e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "airlockd starting");

    let service = Service::new(&args).await?;
    service.run().await
}
