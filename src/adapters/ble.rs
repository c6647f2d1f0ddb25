//! BLE command ingress adapter.
//!
//! Receives raw command frames written by a BLE central and hands them,
//! one at a time, to the main loop.  The adapter never interprets frame
//! contents; every decision belongs to the
//! [`CommandService`](crate::app::service::CommandService).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: simulation with [`BleAdapter::inject_write`].
//!
//! ## GATT Service Layout
//!
//! | Characteristic  | UUID                                    | Perms |
//! |-----------------|-----------------------------------------|-------|
//! | Relay Control   | `6e400002-b5a3-f393-e0a9-e50e24dcca9e`  | Write |
//! | Relay Status    | `6e400003-b5a3-f393-e0a9-e50e24dcca9e`  | Read  |
//!
//! ## Ingress path
//!
//! ```text
//! GATT write ──▶ truncate to 64 B ──▶ queue (4) ──▶ token bucket ──▶ next_frame()
//!                                       │ full          │ empty
//!                                       ▼               ▼
//!                                  drop + warn     drop + warn
//! ```

use burster::Limiter;
use core::fmt::Write as _;
use core::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use core::time::Duration;
use log::{info, warn};

use crate::app::service::FrameStats;
use crate::config::MAX_DEVICE_NAME_LEN;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x6e400001_b5a3_f393_e0a9_e50e24dcca9e;
pub const CHAR_RELAY_CONTROL: u128 = 0x6e400002_b5a3_f393_e0a9_e50e24dcca9e;
pub const CHAR_RELAY_STATUS: u128 = 0x6e400003_b5a3_f393_e0a9_e50e24dcca9e;

/// Longest frame kept; longer writes are cut to this and then rejected
/// by the classifier as an unsupported length.
pub const MAX_FRAME_LEN: usize = 64;

/// Frames buffered between the BLE task and the main loop.
pub const QUEUE_DEPTH: usize = 4;

const MAX_STATUS_BYTES: usize = 96;

/// Ingress budget: refill rate and burst, in frames.
const RATE_PER_SEC: u64 = 10;
const RATE_BURST: u64 = 10;

/// One received frame, as written by the central.
pub type RawFrame = heapless::Vec<u8, MAX_FRAME_LEN>;

type FrameQueue = heapless::Deque<RawFrame, QUEUE_DEPTH>;

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Connected,
    Failed,
}

/// Copy `data` into the queue, truncating oversize writes.
///
/// Returns `false` if the queue was full and the frame was dropped; the
/// caller records the drop in its overflow counter.
fn enqueue(queue: &mut FrameQueue, data: &[u8]) -> bool {
    let kept = data.len().min(MAX_FRAME_LEN);
    if kept < data.len() {
        warn!("BLE: write of {} bytes truncated to {}", data.len(), kept);
    }
    let mut frame = RawFrame::new();
    // Cannot fail: `kept <= MAX_FRAME_LEN`.
    let _ = frame.extend_from_slice(&data[..kept]);
    if queue.push_back(frame).is_err() {
        warn!("BLE: ingress queue full, dropping {}-byte frame", data.len());
        return false;
    }
    true
}

/// Move overflow drops recorded by the writer side into `dropped`.
fn drain_overflow(dropped: &mut u32, overflow: &AtomicU32) {
    let pending = overflow.swap(0, AtomicOrdering::Relaxed);
    *dropped = dropped.saturating_add(pending);
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF BLE static state
// ───────────────────────────────────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures.  These statics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONTROL_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_STATUS_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);
/// 0 = idle, 1 = advertising, 2 = connected.
#[cfg(target_os = "espidf")]
static BLE_LINK: AtomicU32 = AtomicU32::new(0);

// GATTS callbacks run in the Bluedroid task (not ISR), so std Mutex is safe.
#[cfg(target_os = "espidf")]
static BLE_INGRESS: std::sync::Mutex<FrameQueue> = std::sync::Mutex::new(heapless::Deque::new());
/// Writes dropped by the GATTS callback on a full queue, not yet folded
/// into the adapter's counter.
#[cfg(target_os = "espidf")]
static BLE_INGRESS_OVERFLOW: AtomicU32 = AtomicU32::new(0);

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    // SAFETY: esp_bt_uuid_t is a plain C struct; all-zero is valid.
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    t.uuid.uuid128 = uuid.to_le_bytes();
    t
}

#[cfg(target_os = "espidf")]
unsafe fn add_gatt_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32) {
    use esp_idf_svc::sys::*;
    let mut char_uuid = uuid128_to_esp(uuid);
    unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            perm as esp_gatt_perm_t,
            prop as esp_gatt_char_prop_t,
            core::ptr::null_mut(),
            core::ptr::null_mut(),
        );
    }
}

#[cfg(target_os = "espidf")]
unsafe fn start_advertising() {
    use esp_idf_svc::sys::*;
    // SAFETY: all-zero is a valid esp_ble_adv_params_t before the fields below.
    let mut adv_params = esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        ..unsafe { core::mem::zeroed() }
    };
    unsafe {
        esp_ble_gap_start_advertising(&mut adv_params);
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            BLE_LINK.store(1, AtomicOrdering::Relaxed);
            log::info!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    BLE_GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid128_to_esp(SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            unsafe {
                esp_ble_gatts_create_service(gatts_if, &mut svc_id, 6);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc_handle = unsafe { (*param).create.service_handle };
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            BLE_CHAR_STEP.store(1, AtomicOrdering::Relaxed);
            unsafe {
                esp_ble_gatts_start_service(svc_handle);
                add_gatt_char(
                    svc_handle,
                    CHAR_RELAY_CONTROL,
                    ESP_GATT_PERM_WRITE,
                    ESP_GATT_CHAR_PROP_BIT_WRITE,
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = unsafe { (*param).add_char.attr_handle };
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) {
                1 => {
                    BLE_CONTROL_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: control char (handle={})", handle);
                    BLE_CHAR_STEP.store(2, AtomicOrdering::Relaxed);
                    unsafe {
                        add_gatt_char(
                            svc_handle,
                            CHAR_RELAY_STATUS,
                            ESP_GATT_PERM_READ,
                            ESP_GATT_CHAR_PROP_BIT_READ,
                        );
                    }
                }
                2 => {
                    BLE_STATUS_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    BLE_CHAR_STEP.store(3, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: status char (handle={}), all registered", handle);
                }
                _ => {}
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            BLE_LINK.store(2, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: client connected");
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            BLE_LINK.store(1, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: client disconnected");
            unsafe { start_advertising() };
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            if p.handle as u32 != BLE_CONTROL_CHAR_HANDLE.load(AtomicOrdering::Relaxed) {
                return;
            }
            // SAFETY: Bluedroid guarantees `value` points at `len` bytes for
            // the duration of the callback.
            let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
            if let Ok(mut queue) = BLE_INGRESS.lock() {
                if !enqueue(&mut queue, data) {
                    BLE_INGRESS_OVERFLOW.fetch_add(1, AtomicOrdering::Relaxed);
                }
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleAdapter {
    state: BleState,
    device_name: heapless::String<MAX_DEVICE_NAME_LEN>,
    limiter: burster::TokenBucket<fn() -> Duration>,
    status_buf: heapless::String<MAX_STATUS_BYTES>,
    dropped: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_queue: FrameQueue,
    #[cfg(not(target_os = "espidf"))]
    sim_overflow: AtomicU32,
}

impl BleAdapter {
    pub fn new(device_name: heapless::String<MAX_DEVICE_NAME_LEN>) -> Self {
        Self {
            state: BleState::Idle,
            device_name,
            limiter: burster::TokenBucket::new_with_time_provider(
                RATE_PER_SEC,
                RATE_BURST,
                platform_now as fn() -> Duration,
            ),
            status_buf: heapless::String::new(),
            dropped: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_queue: heapless::Deque::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_overflow: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, BleState::Advertising | BleState::Connected)
    }

    /// Frames discarded by the rate limiter or a full queue.
    pub fn dropped(&self) -> u32 {
        self.dropped
            .saturating_add(self.overflow().load(AtomicOrdering::Relaxed))
    }

    pub fn start(&mut self) {
        info!("BLE: starting advertising as '{}'", self.device_name);
        if self.platform_start() {
            self.state = BleState::Advertising;
        } else {
            self.state = BleState::Failed;
        }
    }

    pub fn stop(&mut self) {
        self.platform_stop();
        self.state = BleState::Idle;
        info!("BLE: stopped");
    }

    pub fn on_central_connected(&mut self) {
        info!("BLE: central connected");
        self.state = BleState::Connected;
    }

    pub fn on_central_disconnected(&mut self) {
        info!("BLE: central disconnected");
        if self.state != BleState::Idle {
            self.state = BleState::Advertising;
        }
    }

    /// Next frame to decide, if any.
    ///
    /// Frames over the ingress budget are dropped here, before they
    /// reach the command core.
    pub fn next_frame(&mut self) -> Option<RawFrame> {
        self.sync_link_state();
        self.fold_overflow();
        while let Some(frame) = self.pop_raw() {
            if self.limiter.try_consume(1).is_ok() {
                return Some(frame);
            }
            self.dropped = self.dropped.saturating_add(1);
            warn!("BLE: rate limit exceeded, dropping {}-byte frame", frame.len());
        }
        None
    }

    /// Publish accept/reject counters on the status characteristic.
    pub fn update_status(&mut self, stats: &FrameStats) {
        self.fold_overflow();
        self.status_buf.clear();
        let written = write!(
            self.status_buf,
            "{{\"ok\":{},\"rej\":{},\"drop\":{}}}",
            stats.accepted, stats.rejected, self.dropped,
        );
        if written.is_err() {
            warn!("BLE: status payload exceeds {} bytes", MAX_STATUS_BYTES);
            return;
        }
        let payload = self.status_buf.clone();
        self.platform_update_status(&payload);
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn overflow(&self) -> &AtomicU32 {
        &BLE_INGRESS_OVERFLOW
    }

    #[cfg(not(target_os = "espidf"))]
    fn overflow(&self) -> &AtomicU32 {
        &self.sim_overflow
    }

    #[cfg(target_os = "espidf")]
    fn fold_overflow(&mut self) {
        drain_overflow(&mut self.dropped, &BLE_INGRESS_OVERFLOW);
    }

    #[cfg(not(target_os = "espidf"))]
    fn fold_overflow(&mut self) {
        drain_overflow(&mut self.dropped, &self.sim_overflow);
    }

    #[cfg(target_os = "espidf")]
    fn pop_raw(&mut self) -> Option<RawFrame> {
        BLE_INGRESS.lock().ok().and_then(|mut q| q.pop_front())
    }

    #[cfg(not(target_os = "espidf"))]
    fn pop_raw(&mut self) -> Option<RawFrame> {
        self.sim_queue.pop_front()
    }

    /// Simulate a central writing `data` to the control characteristic.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject_write(&mut self, data: &[u8]) -> bool {
        let queued = enqueue(&mut self.sim_queue, data);
        if !queued {
            self.sim_overflow.fetch_add(1, AtomicOrdering::Relaxed);
        }
        queued
    }

    #[cfg(target_os = "espidf")]
    fn sync_link_state(&mut self) {
        if matches!(self.state, BleState::Idle | BleState::Failed) {
            return;
        }
        match BLE_LINK.load(AtomicOrdering::Relaxed) {
            2 if self.state != BleState::Connected => self.on_central_connected(),
            1 if self.state == BleState::Connected => self.on_central_disconnected(),
            _ => {}
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn sync_link_state(&mut self) {}

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> bool {
        use esp_idf_svc::sys::*;
        // SAFETY: called once from the main task before any BLE traffic.
        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_init failed ({})", ret);
                return false;
            }
            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_enable failed ({})", ret);
                return false;
            }
            let ret = esp_bluedroid_init();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_init failed ({})", ret);
                return false;
            }
            let ret = esp_bluedroid_enable();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_enable failed ({})", ret);
                return false;
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            esp_ble_gatts_app_register(0);

            // NUL-terminated copy of the advertised name.
            let mut name = [0u8; MAX_DEVICE_NAME_LEN + 1];
            let bytes = self.device_name.as_bytes();
            name[..bytes.len()].copy_from_slice(bytes);
            esp_ble_gap_set_device_name(name.as_ptr() as *const _);

            start_advertising();
        }
        info!(
            "BLE(espidf): Bluedroid stack initialised, advertising as '{}'",
            self.device_name
        );
        true
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> bool {
        info!(
            "BLE(sim): advertising '{}' (service {:032x})",
            self.device_name, SERVICE_UUID
        );
        true
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&mut self) {
        use esp_idf_svc::sys::*;
        // SAFETY: tears down the stack brought up in platform_start.
        unsafe {
            esp_ble_gap_stop_advertising();
            esp_bluedroid_disable();
            esp_bluedroid_deinit();
            esp_bt_controller_disable();
            esp_bt_controller_deinit();
        }
        BLE_LINK.store(0, AtomicOrdering::Relaxed);
        info!("BLE(espidf): stack shut down");
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&mut self) {
        self.sim_queue.clear();
        info!("BLE(sim): stopped");
    }

    #[cfg(target_os = "espidf")]
    fn platform_update_status(&mut self, payload: &str) {
        use esp_idf_svc::sys::*;
        let handle = BLE_STATUS_CHAR_HANDLE.load(AtomicOrdering::Relaxed);
        if handle == 0 {
            return;
        }
        // SAFETY: the attribute table copies `payload` before returning.
        unsafe {
            esp_ble_gatts_set_attr_value(handle as u16, payload.len() as u16, payload.as_ptr());
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_update_status(&mut self, payload: &str) {
        info!("BLE(sim): status updated: {}", payload);
    }

    /// Last published status payload.
    pub fn status(&self) -> &str {
        &self.status_buf
    }
}

#[cfg(target_os = "espidf")]
fn platform_now() -> Duration {
    // SAFETY: esp_timer_get_time has no preconditions.
    let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    Duration::from_micros(us as u64)
}

#[cfg(not(target_os = "espidf"))]
fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
