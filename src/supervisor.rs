/// Supervisor: owns the reconnect loop, the shared mutable engine state
/// (active profile, mapping set, config), and the dual input/output task
/// split, grounded on the teacher's `main.rs` connection loop and
/// `run_input_loop`/`run_output_loop` pair — generalized from a single
/// fixed AI-agent profile to the full command surface.

use crate::commands::{EngineCommand, EngineEvent, EngineStateSnapshot, ProfileList};
use crate::config::EngineConfig;
use crate::controller::{self, ConnectionType};
use crate::hid::{self, HidHandle};
use crate::hider;
use crate::input;
use crate::lightbar;
use crate::link::{LinkStateMachine, Transport};
use crate::mapping::{MappingEngine, MappingParams, MappingSet};
use crate::output::{self, AdaptiveTrigger, OutputState};
use crate::profile::{PersistedDocument, Profile};
use crate::synthetic_input::SyntheticInputSink;
use crate::virtual_pad::VirtualPadSink;

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::{sleep, Duration, Instant};

/// Lower bound on how fast `state-update` notifications may be pushed to
/// the UI, and the minimum spacing between outbound HID writes.
const STATE_PUSH_INTERVAL: Duration = Duration::from_millis(20);
const OUTPUT_TICK_INTERVAL: Duration = Duration::from_millis(50);
const MIN_OUTPUT_WRITE_SPACING: Duration = Duration::from_millis(5);

/// Engine state shared between the command-handling task and the active
/// connection's input/output tasks. Guarded by a single async mutex —
/// updates are infrequent (config changes, profile switches) compared to
/// the input loop's per-report cadence, so contention is not a concern.
struct SharedState {
    doc: PersistedDocument,
    mapping: MappingSet,
    config: EngineConfig,
    connected: bool,
    connected_path: Option<String>,
    transport: Transport,
    battery_percent: u8,
    is_charging: bool,
    rumble_left: u8,
    rumble_right: u8,
}

impl SharedState {
    fn snapshot(&self, virtual_pad_available: bool) -> EngineStateSnapshot {
        EngineStateSnapshot {
            connected: self.connected,
            transport: format!("{:?}", self.transport),
            battery_percent: self.battery_percent,
            is_charging: self.is_charging,
            current_profile: self.doc.current_profile.clone(),
            virtual_pad_available,
            hider_available: hider::is_available(),
        }
    }
}

pub struct Supervisor {
    cmd_rx: mpsc::Receiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Supervisor {
    pub fn new(cmd_rx: mpsc::Receiver<EngineCommand>, event_tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { cmd_rx, event_tx }
    }

    pub async fn run(self) {
        let Supervisor { mut cmd_rx, event_tx } = self;

        let (doc, migration_notice) = PersistedDocument::load();
        let active = doc.get(&doc.current_profile).cloned().unwrap_or_else(Profile::default_profile);
        let shared = Arc::new(Mutex::new(SharedState {
            doc,
            mapping: active.mapping_set(),
            config: active.config,
            connected: false,
            connected_path: None,
            transport: Transport::Disconnected,
            battery_percent: 0,
            is_charging: false,
            rumble_left: 0,
            rumble_right: 0,
        }));

        if let Some(msg) = migration_notice {
            let _ = event_tx.send(EngineEvent::Error(msg)).await;
        }

        let virtual_pad_available = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let output_dirty = Arc::new(Notify::new());

        tokio::spawn(run_command_loop(
            Arc::clone(&shared),
            Arc::clone(&virtual_pad_available),
            Arc::clone(&output_dirty),
            cmd_rx_take(&mut cmd_rx),
            event_tx.clone(),
        ));

        let mut api = match hidapi::HidApi::new() {
            Ok(api) => api,
            Err(e) => {
                log::error!("Failed to initialize HID API: {e}");
                let _ = event_tx.send(EngineEvent::Error(format!("HID init failed: {e}"))).await;
                return;
            }
        };

        loop {
            let (info, device) = loop {
                if let Err(e) = api.refresh_devices() {
                    log::debug!("HID refresh failed: {e}");
                }
                match hid::find_controller(&api) {
                    Some(info) => match hid::open_device(&api, &info) {
                        Ok(dev) => break (info, dev),
                        Err(e) => log::warn!("Found controller but failed to open: {e}"),
                    },
                    None => log::debug!("No controller found. Retrying..."),
                }
                sleep(Duration::from_secs(2)).await;
            };

            log::info!("Connected: {} ({})", info.controller_type, info.connection_type);

            if info.connection_type == ConnectionType::Bluetooth {
                if let Err(e) = hid::activate_bt_extended_mode(&device, info.controller_type) {
                    log::error!("Failed to activate BT extended mode: {e}");
                }
            }

            let handle = HidHandle::new(device);
            let ct = info.controller_type;
            let mut link = LinkStateMachine::new(ct, info.connection_type);

            let should_hide = {
                let mut s = shared.lock().await;
                s.connected = true;
                s.connected_path = Some(info.path.clone());
                s.transport = link.transport();
                s.config.hide_controller
            };
            if should_hide {
                if let Err(e) = hider::hide(&[info.path.clone()]) {
                    log::warn!("Failed to hide controller on connect: {e}");
                }
            }
            emit_state(&shared, &event_tx, virtual_pad_available.load(std::sync::atomic::Ordering::Relaxed)).await;

            if info.connection_type == ConnectionType::Bluetooth && link.should_attempt_handshake() {
                link.record_handshake_attempt();
            }

            let output_handle = handle.clone_handle();
            let output_shared = Arc::clone(&shared);
            let output_dirty_clone = Arc::clone(&output_dirty);
            let output_task = tokio::spawn(async move {
                run_output_loop(output_handle, ct, output_shared, output_dirty_clone).await;
            });

            let state_push_shared = Arc::clone(&shared);
            let state_push_vp = Arc::clone(&virtual_pad_available);
            let state_push_events = event_tx.clone();
            let state_push_task = tokio::spawn(async move {
                run_state_push_loop(state_push_shared, state_push_vp, state_push_events).await;
            });

            run_input_loop(&handle, ct, &mut link, &shared, &virtual_pad_available, &event_tx).await;

            output_task.abort();
            state_push_task.abort();
            {
                let mut s = shared.lock().await;
                s.connected = false;
                s.connected_path = None;
                s.transport = Transport::Disconnected;
            }
            emit_state(&shared, &event_tx, false).await;
            // Hiding applies only to the instances of the currently opened
            // controller; the list is always cleared on disconnect.
            let _ = hider::unhide_all();
            log::info!("Controller disconnected. Scanning for new connection...");
            sleep(Duration::from_secs(1)).await;
        }
    }
}

/// `mpsc::Receiver` isn't `Clone`; this just moves ownership into the
/// command task while keeping the intent explicit at the call site.
fn cmd_rx_take(cmd_rx: &mut mpsc::Receiver<EngineCommand>) -> mpsc::Receiver<EngineCommand> {
    std::mem::replace(cmd_rx, mpsc::channel(1).1)
}

async fn emit_state(shared: &Arc<Mutex<SharedState>>, event_tx: &mpsc::Sender<EngineEvent>, vp_available: bool) {
    let snap = shared.lock().await.snapshot(vp_available);
    let _ = event_tx.send(EngineEvent::State(snap)).await;
}

async fn run_command_loop(
    shared: Arc<Mutex<SharedState>>,
    virtual_pad_available: Arc<std::sync::atomic::AtomicBool>,
    output_dirty: Arc<Notify>,
    mut cmd_rx: mpsc::Receiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let mut s = shared.lock().await;
        match cmd {
            EngineCommand::GetInitialState => {
                let snap = s.snapshot(virtual_pad_available.load(std::sync::atomic::Ordering::Relaxed));
                drop(s);
                let _ = event_tx.send(EngineEvent::State(snap)).await;
            }
            EngineCommand::UpdateMappings(mapping) => {
                s.mapping = mapping;
            }
            EngineCommand::SetRgb { r, g, b } => {
                s.config.rgb.r = r;
                s.config.rgb.g = g;
                s.config.rgb.b = b;
                output_dirty.notify_one();
            }
            EngineCommand::SetPlayerLedBrightness(b) => {
                s.config.player_led_brightness = b;
                output_dirty.notify_one();
            }
            EngineCommand::SetShowBatteryLed(show) => {
                s.config.show_battery_led = show;
                output_dirty.notify_one();
            }
            EngineCommand::SetDeadzones { left, right } => {
                s.config.deadzone_left = left;
                s.config.deadzone_right = right;
            }
            EngineCommand::SetMouseSens { left, right } => {
                s.config.mouse_sens_left = left;
                s.config.mouse_sens_right = right;
            }
            EngineCommand::SetTouchpadSens(v) => {
                s.config.mouse_sens_touchpad = v;
            }
            EngineCommand::SetTriggerL2 { mode, start, force } => {
                s.config.trigger_l2 = AdaptiveTrigger { mode, start, force };
                output_dirty.notify_one();
            }
            EngineCommand::SetTriggerR2 { mode, start, force } => {
                s.config.trigger_r2 = AdaptiveTrigger { mode, start, force };
                output_dirty.notify_one();
            }
            EngineCommand::SetHideController(hide) => {
                s.config.hide_controller = hide;
                if hide {
                    if let Some(path) = s.connected_path.clone() {
                        drop(s);
                        if let Err(e) = hider::hide(&[path]) {
                            let _ = event_tx.send(EngineEvent::Error(format!("hide failed: {e}"))).await;
                        }
                        continue;
                    }
                } else {
                    let _ = hider::unhide_all();
                }
            }
            EngineCommand::SaveProfile(name) => {
                let profile = Profile {
                    name: name.clone(),
                    mappings: s.mapping.iter().map(|(k, v)| (*k, v.clone())).collect(),
                    config: s.config.clone(),
                };
                s.doc.upsert(profile);
                s.doc.current_profile = name;
                let doc_clone = s.doc.clone();
                drop(s);
                let _ = tokio::task::spawn_blocking(move || doc_clone.save()).await;
                continue;
            }
            EngineCommand::LoadProfile(name) => {
                if let Some(p) = s.doc.get(&name).cloned() {
                    s.mapping = p.mapping_set();
                    s.config = p.config;
                    s.doc.current_profile = name;
                } else {
                    drop(s);
                    let _ = event_tx.send(EngineEvent::Error(format!("profile not found: {name}"))).await;
                    continue;
                }
            }
            EngineCommand::DeleteProfile(name) => {
                if !s.doc.delete(&name) {
                    drop(s);
                    let _ = event_tx
                        .send(EngineEvent::Error(format!("cannot delete profile: {name}")))
                        .await;
                    continue;
                }
            }
            EngineCommand::GetProfiles => {
                let list = ProfileList { names: s.doc.names(), current: s.doc.current_profile.clone() };
                drop(s);
                let _ = event_tx.send(EngineEvent::Profiles(list)).await;
                continue;
            }
            EngineCommand::DisconnectController => {
                // Handled by the connection loop noticing a read failure;
                // nothing to do from in here beyond logging intent.
                log::info!("Disconnect requested by UI");
            }
            EngineCommand::TriggerDriverRefresh => {
                log::info!("Driver refresh requested; hider available = {}", hider::is_available());
            }
        }
    }
}

/// Input loop: read HID reports, decode, drive the link state machine, map
/// to virtual-pad/synthetic-input frames. Returns when the device
/// disconnects.
async fn run_input_loop(
    handle: &HidHandle,
    ct: controller::ControllerType,
    link: &mut LinkStateMachine,
    shared: &Arc<Mutex<SharedState>>,
    virtual_pad_available: &Arc<std::sync::atomic::AtomicBool>,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    let mut mapping_engine = MappingEngine::new();
    let mut virtual_pad = VirtualPadSink::new();
    let mut synthetic = SyntheticInputSink::default();
    let mut buf = [0u8; 128];
    let mut consecutive_errors = 0u32;

    loop {
        match handle.read(&mut buf) {
            Err(_) => break,
            Ok(0) => {
                sleep(Duration::from_millis(4)).await;
                continue;
            }
            Ok(n) => {
                let data = &buf[..n];
                let conn = link.transport().connection_type().unwrap_or(ConnectionType::Usb);

                if link.transport().needs_crc() && !input::validate_bt_crc(ct, data) {
                    consecutive_errors += 1;
                    if consecutive_errors % 100 == 1 {
                        log::warn!("BT CRC validation failed ({consecutive_errors} times)");
                    }
                    continue;
                }

                match input::parse(ct, conn, data) {
                    Ok(state) => {
                        consecutive_errors = 0;
                        link.observe_report_id(data[0], true);

                        let (mapping, params) = {
                            let mut s = shared.lock().await;
                            s.battery_percent = state.battery_percent;
                            s.is_charging = state.is_charging();
                            s.transport = link.transport();
                            (
                                s.mapping.clone(),
                                MappingParams {
                                    deadzone_left: s.config.deadzone_left,
                                    deadzone_right: s.config.deadzone_right,
                                },
                            )
                        };

                        let (pad, edges, moves, scrolls) = mapping_engine.process(&state, &mapping, &params);
                        virtual_pad.submit(&pad);
                        virtual_pad_available.store(virtual_pad.is_available(), std::sync::atomic::Ordering::Relaxed);
                        if let Some((left, right)) = virtual_pad.poll_rumble() {
                            let mut s = shared.lock().await;
                            s.rumble_left = left;
                            s.rumble_right = right;
                        }
                        synthetic.apply(&edges);
                        for (dx, dy) in moves {
                            synthetic.apply_move(dx, dy);
                        }
                        for ticks in scrolls {
                            synthetic.apply_scroll(ticks);
                        }
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        if consecutive_errors % 100 == 1 {
                            log::warn!("Input parse error ({consecutive_errors}): {e}");
                        }
                        link.observe_report_id(data.first().copied().unwrap_or(0), false);
                    }
                }
            }
        }
    }

    synthetic.release_all();
    virtual_pad.unplug();
    link.mark_disconnected();
    {
        let mut s = shared.lock().await;
        s.rumble_left = 0;
        s.rumble_right = 0;
    }
    let _ = event_tx.send(EngineEvent::State(shared.lock().await.snapshot(false))).await;
}

/// Output loop: a periodic timer emits the assembled report; any command
/// that changes report contents (`output_dirty`) triggers an immediate
/// send instead of waiting out the full tick, but never closer together
/// than `MIN_OUTPUT_WRITE_SPACING` to the previous write.
async fn run_output_loop(
    handle: HidHandle,
    ct: controller::ControllerType,
    shared: Arc<Mutex<SharedState>>,
    output_dirty: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(OUTPUT_TICK_INTERVAL);
    let mut last_write: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = output_dirty.notified() => {}
        }

        if last_write.is_some_and(|t| t.elapsed() < MIN_OUTPUT_WRITE_SPACING) {
            continue;
        }

        let (conn, out) = {
            let s = shared.lock().await;
            let conn = match s.transport.connection_type() {
                Some(c) => c,
                None => break,
            };
            let (r, g, b) = lightbar::scale_rgb(s.config.rgb.r, s.config.rgb.g, s.config.rgb.b, s.config.rgb.brightness);
            let out = OutputState {
                lightbar_r: r,
                lightbar_g: g,
                lightbar_b: b,
                rumble_left: s.rumble_left,
                rumble_right: s.rumble_right,
                player_leds: output::player_led_mask(s.battery_percent, s.config.show_battery_led),
                mute_led: 0,
                trigger_l2: s.config.trigger_l2,
                trigger_r2: s.config.trigger_r2,
            };
            (conn, out)
        };
        let report = output::build_report(ct, conn, &out);
        handle.write(&report);
        last_write = Some(Instant::now());
    }
}

/// Pushes `state-update` events to the UI at a fixed rate, decoupled from
/// the HID input poll rate (which can run far faster than the 60 Hz cap
/// this notification is bounded to).
async fn run_state_push_loop(
    shared: Arc<Mutex<SharedState>>,
    virtual_pad_available: Arc<std::sync::atomic::AtomicBool>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let mut ticker = tokio::time::interval(STATE_PUSH_INTERVAL);
    loop {
        ticker.tick().await;
        let vp = virtual_pad_available.load(std::sync::atomic::Ordering::Relaxed);
        let snap = shared.lock().await.snapshot(vp);
        if event_tx.send(EngineEvent::State(snap)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_state_snapshot_reflects_fields() {
        let doc = PersistedDocument::default();
        let s = SharedState {
            doc,
            mapping: crate::mapping::default_mapping(),
            config: EngineConfig::default(),
            connected: true,
            connected_path: Some("usb_path".into()),
            transport: Transport::Usb,
            battery_percent: 42,
            is_charging: false,
            rumble_left: 0,
            rumble_right: 0,
        };
        let snap = s.snapshot(true);
        assert!(snap.connected);
        assert_eq!(snap.battery_percent, 42);
        assert_eq!(snap.current_profile, "Default");
    }
}
