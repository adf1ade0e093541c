use crate::call::manager::PeerConnectionManager;
use crate::engine::{EngineEvent, EngineFactory};
use crate::media::{MediaDevices, MediaStream};
use crate::signaling::SignalingChannel;
use parley_core::{
    ConnectionId, LocalTrack, MediaConstraints, NegotiationError, NegotiationState, RemoteTrack,
    ServerEvent, SessionDescription,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// User-triggered actions, serialized into the coordinator's event loop so
/// they never race signaling or engine callbacks.
#[derive(Debug)]
pub enum CallCommand {
    /// Offer a call to the known remote peer. Requires prior discovery via
    /// `user:joined`; never fires on its own.
    StartCall,
    /// Attach another local track to the running call.
    AddTrack(LocalTrack),
    /// Hang up. A second hangup in a row is a no-op.
    EndCall,
}

pub struct CoordinatorConfig {
    /// Our own connection id; also the glare tie-break key.
    pub id: ConnectionId,
    pub constraints: MediaConstraints,
}

/// The display layer's view of a call: issue commands, observe state.
/// It holds no control logic; rendering follows `state()` alone.
#[derive(Clone)]
pub struct CallHandle {
    commands: mpsc::Sender<CallCommand>,
    state: watch::Receiver<NegotiationState>,
}

impl CallHandle {
    pub async fn start_call(&self) {
        let _ = self.commands.send(CallCommand::StartCall).await;
    }

    pub async fn add_track(&self, track: LocalTrack) {
        let _ = self.commands.send(CallCommand::AddTrack(track)).await;
    }

    pub async fn end_call(&self) {
        let _ = self.commands.send(CallCommand::EndCall).await;
    }

    pub fn state(&self) -> NegotiationState {
        *self.state.borrow()
    }

    /// Block until the coordinator reports `target`. Returns false if the
    /// coordinator went away first.
    pub async fn wait_for(&mut self, target: NegotiationState) -> bool {
        loop {
            if *self.state.borrow_and_update() == target {
                return true;
            }
            if self.state.changed().await.is_err() {
                return false;
            }
        }
    }
}

/// The negotiation state machine for one client session.
///
/// Runs as a single event loop over three sources -- user commands, events
/// from the relay, events from the peer-connection engine -- so handlers are
/// serialized and interleave only at await points. One engine and one local
/// stream exist per call, owned here and nowhere else.
pub struct NegotiationCoordinator {
    config: CoordinatorConfig,
    channel: SignalingChannel,
    engines: Arc<dyn EngineFactory>,
    devices: Arc<dyn MediaDevices>,

    command_rx: mpsc::Receiver<CallCommand>,
    event_rx: mpsc::Receiver<ServerEvent>,
    engine_rx: Option<mpsc::Receiver<EngineEvent>>,

    manager: Option<PeerConnectionManager>,
    local_stream: Option<MediaStream>,
    remote_peer: Option<ConnectionId>,
    /// A negotiation-needed signal that arrived mid-round; replayed when the
    /// round resolves. A later signal supersedes it, keeping at most one
    /// outstanding offer per pair.
    renegotiate_pending: bool,

    state_tx: watch::Sender<NegotiationState>,
    remote_track_tx: mpsc::UnboundedSender<RemoteTrack>,
}

impl NegotiationCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        channel: SignalingChannel,
        event_rx: mpsc::Receiver<ServerEvent>,
        engines: Arc<dyn EngineFactory>,
        devices: Arc<dyn MediaDevices>,
    ) -> (Self, CallHandle, mpsc::UnboundedReceiver<RemoteTrack>) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(NegotiationState::Idle);
        let (remote_track_tx, remote_track_rx) = mpsc::unbounded_channel();

        let coordinator = Self {
            config,
            channel,
            engines,
            devices,
            command_rx,
            event_rx,
            engine_rx: None,
            manager: None,
            local_stream: None,
            remote_peer: None,
            renegotiate_pending: false,
            state_tx,
            remote_track_tx,
        };

        let handle = CallHandle {
            commands: command_tx,
            state: state_rx,
        };

        (coordinator, handle, remote_track_rx)
    }

    pub async fn run(mut self) {
        info!(id = %self.config.id, "negotiation coordinator started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => break,
                    }
                }

                evt = self.event_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_server_event(e).await,
                        None => {
                            info!("signaling channel closed, shutting down");
                            break;
                        }
                    }
                }

                evt = async {
                    match self.engine_rx.as_mut() {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match evt {
                        Some(e) => self.handle_engine_event(e).await,
                        None => self.engine_rx = None,
                    }
                }
            }
        }

        info!(id = %self.config.id, "negotiation coordinator finished");
    }

    fn publish(&self, state: NegotiationState) {
        let _ = self.state_tx.send(state);
    }

    async fn handle_command(&mut self, cmd: CallCommand) {
        match cmd {
            CallCommand::StartCall => self.start_call().await,
            CallCommand::AddTrack(track) => self.add_track(track).await,
            CallCommand::EndCall => self.end_call().await,
        }
    }

    async fn start_call(&mut self) {
        let Some(to) = self.remote_peer else {
            warn!("start ignored, no remote peer discovered yet");
            return;
        };
        if self.manager.is_some() {
            warn!("start ignored, a call is already in progress");
            return;
        }

        // Device acquisition happens first; a refusal aborts the call before
        // anything goes over signaling.
        let stream = match self.devices.acquire(self.config.constraints).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("call aborted, media acquisition failed: {e}");
                return;
            }
        };

        let mut manager = match self.create_manager().await {
            Some(m) => m,
            None => return,
        };

        let offer = match manager.create_offer().await {
            Ok(offer) => offer,
            Err(e) => {
                warn!("call aborted, offer creation failed: {e}");
                self.engine_rx = None;
                return;
            }
        };

        // Tracks acquired before the call queue behind the round and attach
        // once the answer lands (answer-then-attach).
        for track in stream.tracks().to_vec() {
            if let Err(e) = manager.add_local_track(track).await {
                warn!("failed to queue local track: {e}");
            }
        }
        self.local_stream = Some(stream);

        if let Err(e) = self.channel.call(to, offer).await {
            warn!("offer could not be sent: {e}");
            let _ = manager.end().await;
            self.engine_rx = None;
            self.local_stream = None;
            self.publish(NegotiationState::CallerReady);
            return;
        }

        manager.offer_sent();
        self.publish(manager.state());
        self.manager = Some(manager);
    }

    async fn add_track(&mut self, track: LocalTrack) {
        let Some(manager) = self.manager.as_mut() else {
            warn!("track ignored, no active call");
            return;
        };
        if let Err(e) = manager.add_local_track(track).await {
            warn!("failed to add local track: {e}");
        }
    }

    async fn end_call(&mut self) {
        if self.manager.is_none() {
            debug!("end ignored, no active call");
            return;
        }

        if let Some(stream) = self.local_stream.as_mut() {
            stream.stop();
        }
        self.local_stream = None;

        if let Some(to) = self.remote_peer {
            if let Err(e) = self.channel.end_call(to).await {
                debug!("hangup not delivered: {e}");
            }
        }

        self.discard_call().await;
        info!("call ended locally");
        self.publish(NegotiationState::Idle);
    }

    async fn handle_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::RoomJoined { email, room } => {
                info!(email, room, "room join confirmed");
            }

            ServerEvent::RoomFull { room } => {
                warn!(room, "join rejected, room is full");
            }

            ServerEvent::UserJoined { email, id } => {
                info!(email, %id, "peer joined the room");
                self.remote_peer = Some(id);
                if self.manager.is_none() {
                    // Discovery alone never dials; calling stays an explicit
                    // user action.
                    self.publish(NegotiationState::CallerReady);
                }
            }

            ServerEvent::UserLeft { id } => {
                if self.remote_peer == Some(id) {
                    info!(%id, "peer left the room");
                    self.remote_peer = None;
                    if self.manager.is_some() {
                        self.teardown_after_remote_loss().await;
                    } else {
                        self.publish(NegotiationState::Idle);
                    }
                }
            }

            ServerEvent::IncomingCall { from, offer } => {
                self.on_incoming_call(from, offer).await;
            }

            ServerEvent::CallAccepted { from, ans } => {
                self.on_call_accepted(from, ans).await;
            }

            ServerEvent::NegoOffer { from, offer } => {
                self.on_nego_offer(from, offer).await;
            }

            ServerEvent::NegoFinal { ans } => {
                self.on_nego_final(ans).await;
            }

            ServerEvent::CallEnded { from } => {
                info!(%from, "remote hangup");
                if self.manager.is_some() {
                    self.teardown_after_remote_loss().await;
                }
            }

            ServerEvent::RelayError { reason } => {
                // Non-fatal by contract; local negotiation state is untouched.
                warn!(reason, "relay reported an error");
            }
        }
    }

    async fn on_incoming_call(&mut self, from: ConnectionId, offer: SessionDescription) {
        if let Some(state) = self.manager.as_ref().map(|m| m.state()) {
            match state {
                NegotiationState::Offering | NegotiationState::AwaitingAnswer => {
                    // Glare: both sides offered at once. The lower id is the
                    // polite peer and defers to the incoming offer; the other
                    // side drops it and lets its own round stand.
                    if self.config.id < from {
                        info!(%from, "glare, abandoning our offer for the incoming one");
                        self.discard_call().await;
                    } else {
                        debug!(%from, "glare, ignoring incoming offer");
                        return;
                    }
                }
                _ => {
                    warn!(%from, "unexpected offer during an active call, dropped");
                    return;
                }
            }
        }

        self.remote_peer = Some(from);

        if self.local_stream.is_none() {
            match self.devices.acquire(self.config.constraints).await {
                Ok(stream) => self.local_stream = Some(stream),
                Err(e) => {
                    warn!("incoming call not answered, media acquisition failed: {e}");
                    return;
                }
            }
        }

        let Some(mut manager) = self.create_manager().await else {
            return;
        };

        let answer = match manager.create_answer(offer).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(%from, "invalid incoming offer, dropped: {e}");
                self.engine_rx = None;
                return;
            }
        };

        if let Err(e) = self.channel.accept(from, answer).await {
            warn!("answer could not be sent: {e}");
            let _ = manager.end().await;
            self.engine_rx = None;
            return;
        }

        // Local media attaches after the answer; each attachment comes back
        // from the engine as negotiation-needed and pushes our tracks to the
        // caller in a renegotiation round.
        if let Some(stream) = self.local_stream.as_ref() {
            for track in stream.tracks().to_vec() {
                if let Err(e) = manager.add_local_track(track).await {
                    warn!("failed to attach local track: {e}");
                }
            }
        }

        self.publish(manager.state());
        self.manager = Some(manager);
    }

    async fn on_call_accepted(&mut self, from: ConnectionId, ans: SessionDescription) {
        let Some(manager) = self.manager.as_mut() else {
            debug!(%from, "answer without an active call, dropped");
            return;
        };

        // This event completes the initial round only; a renegotiation round
        // resolves through `peer:nego:final`, never through here.
        if manager.state() != NegotiationState::AwaitingAnswer {
            debug!(%from, "answer does not match an initial round, dropped");
            return;
        }

        match manager.apply_remote_answer(ans).await {
            Ok(()) => {
                info!(%from, "call accepted, session established");
                self.publish(NegotiationState::Established);
            }
            Err(NegotiationError::StaleNegotiation) => {
                debug!(%from, "stale answer dropped");
            }
            Err(e) => {
                warn!(%from, "answer rejected: {e}");
            }
        }
    }

    async fn on_nego_offer(&mut self, from: ConnectionId, offer: SessionDescription) {
        let Some(state) = self.manager.as_ref().map(|m| m.state()) else {
            warn!(%from, "renegotiation offer without an active call, dropped");
            return;
        };

        // Renegotiation glare: both sides offered on an established session
        // at once. Same tie-break as at call setup -- the lower id rolls its
        // own round back and answers, the higher id lets its round stand.
        if state == NegotiationState::Renegotiating {
            if self.config.id < from {
                info!(%from, "renegotiation glare, abandoning our round");
                let Some(manager) = self.manager.as_mut() else {
                    return;
                };
                if let Err(e) = manager.abort_round().await {
                    warn!("could not abandon the round: {e}");
                    return;
                }
                // Whatever our round was carrying gets re-offered once
                // theirs resolves.
                self.renegotiate_pending = true;
            } else {
                debug!(%from, "renegotiation glare, ignoring incoming offer");
                return;
            }
        }

        let Some(manager) = self.manager.as_mut() else {
            return;
        };

        let answer = match manager.create_answer(offer).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(%from, "renegotiation offer rejected: {e}");
                return;
            }
        };

        if let Err(e) = self.channel.nego_answer(from, answer).await {
            warn!("renegotiation answer could not be sent: {e}");
            return;
        }

        let state = manager.state();
        self.publish(state);

        // The answer left before this offer does, so the remote resolves its
        // round first and sees ours as a fresh one.
        if self.renegotiate_pending {
            self.renegotiate_pending = false;
            self.renegotiate().await;
        }
    }

    async fn on_nego_final(&mut self, ans: SessionDescription) {
        let Some(manager) = self.manager.as_mut() else {
            debug!("renegotiation answer without an active call, dropped");
            return;
        };

        // Mirror of the `call:accepted` guard: this event resolves a
        // renegotiation round only.
        if manager.state() != NegotiationState::Renegotiating {
            debug!("renegotiation answer without a round in flight, dropped");
            return;
        }

        match manager.apply_remote_answer(ans).await {
            Ok(()) => {
                info!("renegotiation complete");
                self.publish(NegotiationState::Established);
            }
            Err(NegotiationError::StaleNegotiation) => {
                debug!("stale renegotiation answer dropped");
                return;
            }
            Err(e) => {
                warn!("renegotiation answer rejected: {e}");
                return;
            }
        }

        if self.renegotiate_pending {
            self.renegotiate_pending = false;
            self.renegotiate().await;
        }
    }

    async fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::NegotiationNeeded => {
                let established = self
                    .manager
                    .as_ref()
                    .is_some_and(|m| m.state() == NegotiationState::Established);
                if established {
                    self.renegotiate().await;
                } else if self.manager.is_some() {
                    // Mid-round; replay once the round resolves. A newer
                    // signal simply overwrites the flag.
                    debug!("negotiation-needed during a round, deferred");
                    self.renegotiate_pending = true;
                }
            }

            EngineEvent::TrackReceived(track) => {
                info!(id = %track.id, kind = ?track.kind, "remote track");
                let _ = self.remote_track_tx.send(track);
            }

            EngineEvent::Closed => {
                if self.manager.is_some() {
                    info!("engine transport closed, inferring remote termination");
                    self.teardown_after_remote_loss().await;
                }
            }
        }
    }

    /// Run one full renegotiation round from the offering side.
    async fn renegotiate(&mut self) {
        let Some(to) = self.remote_peer else {
            warn!("renegotiation skipped, remote peer unknown");
            return;
        };
        let Some(manager) = self.manager.as_mut() else {
            return;
        };

        let offer = match manager.create_offer().await {
            Ok(offer) => offer,
            Err(e) => {
                debug!("renegotiation offer refused: {e}");
                return;
            }
        };

        if let Err(e) = self.channel.nego_offer(to, offer).await {
            warn!("renegotiation offer could not be sent: {e}");
            return;
        }

        manager.offer_sent();
        let state = manager.state();
        self.publish(state);
    }

    async fn create_manager(&mut self) -> Option<PeerConnectionManager> {
        match self.engines.create().await {
            Ok((engine, events)) => {
                self.engine_rx = Some(events);
                Some(PeerConnectionManager::new(engine))
            }
            Err(e) => {
                warn!("failed to create peer engine: {e}");
                None
            }
        }
    }

    /// Drop the per-call state without touching local media or signaling.
    async fn discard_call(&mut self) {
        if let Some(mut manager) = self.manager.take() {
            if let Err(e) = manager.end().await {
                debug!("engine close failed: {e}");
            }
        }
        self.engine_rx = None;
        self.renegotiate_pending = false;
    }

    /// The remote side is gone (explicit hangup, departure, or stream loss):
    /// stop local media and return to idle.
    async fn teardown_after_remote_loss(&mut self) {
        if let Some(stream) = self.local_stream.as_mut() {
            stream.stop();
        }
        self.local_stream = None;
        self.discard_call().await;
        self.publish(NegotiationState::Idle);
    }
}
