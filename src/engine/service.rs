use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::NegotiationSettings;
use crate::engine::protocol::{CompareReport, ServiceCommand, ServiceResponse};
use crate::engine::scheduler::TurnScheduler;
use crate::engine::session::NegotiationSession;
use crate::model::fragment::MosaicId;
use crate::model::interest::InterestProfile;
use crate::model::outcome::NegotiationOutcome;
use crate::store::{build_profiles, FragmentStore, NotificationStore};

/// Everything a session task needs, shared by all of them.
#[derive(Clone)]
pub struct ServiceDeps {
    pub scheduler: Arc<TurnScheduler>,
    pub fragments: Arc<dyn FragmentStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub settings: NegotiationSettings,
}

/// Command loop running one task per negotiation.
///
/// Sessions share nothing but the scheduler's admission limiter. On
/// `Shutdown` (or when every sender is gone) all live sessions are
/// cancelled and awaited before `run` returns.
pub struct MatchService {
    rx: mpsc::Receiver<ServiceCommand>,
    deps: ServiceDeps,
    shutdown: CancellationToken,
    sessions: JoinSet<()>,
}

impl MatchService {
    pub fn new(rx: mpsc::Receiver<ServiceCommand>, deps: ServiceDeps) -> Self {
        Self {
            rx,
            deps,
            shutdown: CancellationToken::new(),
            sessions: JoinSet::new(),
        }
    }

    /// Cancelling this token stops every running session.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(mut self) {
        info!("match service started");

        loop {
            let cmd = tokio::select! {
                cmd = self.rx.recv() => cmd,
                Some(joined) = self.sessions.join_next() => {
                    log_join(joined);
                    continue;
                }
            };

            match cmd {
                Some(ServiceCommand::Shutdown) | None => break,
                Some(cmd) => self.dispatch(cmd),
            }
        }

        self.shutdown.cancel();
        let pending = self.sessions.len();
        while let Some(joined) = self.sessions.join_next().await {
            log_join(joined);
        }
        info!(cancelled_sessions = pending, "match service stopped");
    }

    fn dispatch(&mut self, cmd: ServiceCommand) {
        let deps = self.deps.clone();
        let cancel = self.shutdown.child_token();

        match cmd {
            ServiceCommand::Compare {
                mosaic_a,
                mosaic_b,
                reply,
            } => {
                debug!(mosaic_a, mosaic_b, "compare requested");
                self.sessions.spawn(async move {
                    let work = async {
                        match compare_mosaics(&deps, mosaic_a, mosaic_b, &cancel).await {
                            Ok(report) => ServiceResponse::Compared(report),
                            Err(e) => ServiceResponse::Rejected {
                                reason: format!("{:#}", e),
                            },
                        }
                    };
                    serve(work, reply, &cancel).await;
                });
            }

            ServiceCommand::Negotiate {
                profile_a,
                profile_b,
                reply,
            } => {
                self.sessions.spawn(async move {
                    let work = async {
                        ServiceResponse::Negotiated(
                            negotiate(&deps, profile_a, profile_b, &cancel).await,
                        )
                    };
                    serve(work, reply, &cancel).await;
                });
            }

            ServiceCommand::Shutdown => {}
        }
    }
}

/// Runs `work`, cancelling it if the requester stops waiting.
async fn serve<F>(work: F, mut reply: oneshot::Sender<ServiceResponse>, cancel: &CancellationToken)
where
    F: Future<Output = ServiceResponse>,
{
    tokio::pin!(work);

    let finished = tokio::select! {
        response = &mut work => Some(response),
        _ = reply.closed() => None,
    };

    let response = match finished {
        Some(response) => response,
        None => {
            debug!("requester went away, cancelling session");
            cancel.cancel();
            work.await
        }
    };

    let _ = reply.send(response);
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "session task ended abnormally");
    }
}

pub async fn negotiate(
    deps: &ServiceDeps,
    profile_a: InterestProfile,
    profile_b: InterestProfile,
    cancel: &CancellationToken,
) -> NegotiationOutcome {
    let mut session = NegotiationSession::new(
        profile_a,
        profile_b,
        deps.settings.max_rounds,
        deps.settings.goal.clone(),
    );
    session.run(&deps.scheduler, cancel).await
}

/// Builds both profiles, negotiates, and on convergence notifies both mosaics.
/// A failed notification is logged and reported, never turned into a failed negotiation.
pub async fn compare_mosaics(
    deps: &ServiceDeps,
    mosaic_a: MosaicId,
    mosaic_b: MosaicId,
    cancel: &CancellationToken,
) -> anyhow::Result<CompareReport> {
    let (profile_a, profile_b) =
        build_profiles(deps.fragments.as_ref(), mosaic_a, mosaic_b, deps.settings.top_k).await?;

    let outcome = negotiate(deps, profile_a, profile_b, cancel).await;

    let mut notified = false;
    if let Some(question) = outcome.question() {
        notified = true;
        for mosaic_id in [mosaic_a, mosaic_b] {
            if let Err(e) = deps.notifications.submit(mosaic_id, question).await {
                warn!(mosaic_id, error = %format!("{:#}", e), "notification failed");
                notified = false;
            }
        }
    }

    Ok(CompareReport {
        mosaic_a,
        mosaic_b,
        outcome,
        notified,
    })
}
