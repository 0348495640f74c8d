//! JNI entry points and the process-wide bridge installation.
//!
//! Java resolves native methods by symbol name, so the inbound callbacks
//! cannot carry a bridge instance; they forward to the bridge installed by
//! [`launch`]. Callbacks that arrive before installation are logged and
//! dropped.

use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use bridge_traits::BridgeError;
use core_bridge::{AppHandler, BridgeConfig, BridgeInbound, Error, HostBridge, REQUEST_PREPARE_VPN};
use core_runtime::config::BridgeConfigBuilder;
use jni::objects::{JClass, JObject};
use jni::sys::{jboolean, jint, JNI_TRUE};
use jni::JNIEnv;
use tracing::{debug, error, info, warn};

use crate::handles::HandleTable;
use crate::host::AndroidHost;

/// Android's `Activity.RESULT_OK`.
pub const RESULT_OK: jint = -1;

const LOOP_THREAD: &str = "hostlink-bridge";

struct Installed {
    inbound: BridgeInbound,
    bridge: Arc<HostBridge>,
    handles: Arc<HandleTable>,
}

static INSTALLED: OnceLock<Installed> = OnceLock::new();

/// Build the bridge over `app_context`, install it for the JNI entry points
/// and start its loop on a dedicated thread.
///
/// `configure` receives a builder with the host already set.
///
/// # Errors
///
/// - [`Error::AlreadyRunning`] if a bridge is already installed in this process
/// - [`Error::Host`] if the VM or context cannot be pinned, or the loop thread
///   cannot be spawned
/// - [`Error::Runtime`] if the configuration is invalid
pub fn launch<H, F>(
    env: &mut JNIEnv,
    app_context: &JObject,
    configure: F,
    handler: H,
) -> Result<JoinHandle<()>, Error>
where
    H: AppHandler + 'static,
    F: FnOnce(BridgeConfigBuilder) -> BridgeConfigBuilder,
{
    if INSTALLED.get().is_some() {
        return Err(Error::AlreadyRunning);
    }

    let handles = Arc::new(HandleTable::new());
    let host = AndroidHost::new(env, app_context, Arc::clone(&handles))?;
    let config = configure(BridgeConfig::builder().host(Arc::new(host))).build()?;

    let (bridge, inbound) = HostBridge::create(config);
    let bridge = Arc::new(bridge);
    INSTALLED
        .set(Installed {
            inbound,
            bridge: Arc::clone(&bridge),
            handles,
        })
        .map_err(|_| Error::AlreadyRunning)?;

    let thread = thread::Builder::new()
        .name(LOOP_THREAD.to_string())
        .spawn(move || run_loop(bridge, handler))
        .map_err(BridgeError::from)?;

    info!("Host bridge launched");
    Ok(thread)
}

fn run_loop<H: AppHandler>(bridge: Arc<HostBridge>, handler: H) {
    let runtime = match core_async::runtime::current_thread() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "Failed to build bridge runtime");
            return;
        }
    };

    match runtime.block_on(bridge.run(handler)) {
        Ok(_) => info!("Bridge loop exited"),
        Err(err) => error!(error = %err, "Bridge loop failed"),
    }
}

fn installed(entry: &'static str) -> Option<&'static Installed> {
    let installed = INSTALLED.get();
    if installed.is_none() {
        warn!(entry, "Bridge not installed, dropping callback");
    }
    installed
}

/// Route an activity result to the matching lifecycle signal.
pub(crate) fn route_activity_result(inbound: &BridgeInbound, request_code: jint, result_code: jint) {
    if request_code != REQUEST_PREPARE_VPN {
        debug!(request_code, "Ignoring activity result");
        return;
    }
    if result_code == RESULT_OK {
        inbound.signal_prepared();
    } else {
        inbound.signal_closed();
    }
}

fn hand_off_service(env: &JNIEnv, service: &JObject, connect: bool) {
    let Some(installed) = installed(if connect { "connect" } else { "disconnect" }) else {
        return;
    };

    let handle = match installed.handles.pin(env, service, "service") {
        Ok(handle) => handle,
        Err(err) => {
            error!(error = %err, "Failed to pin service");
            return;
        }
    };

    let result = if connect {
        installed.inbound.handoff_connect(handle)
    } else {
        installed.inbound.handoff_disconnect(handle)
    };
    if let Err(err) = result {
        // The returned handle, if any, is released here.
        warn!(error = ?err, "Service handoff rejected, bridge stopped");
    }
}

#[no_mangle]
pub extern "system" fn Java_com_hostlink_App_onVPNPrepared(_env: JNIEnv, _class: JClass) {
    if let Some(installed) = installed("onVPNPrepared") {
        installed.inbound.signal_prepared();
    }
}

#[no_mangle]
pub extern "system" fn Java_com_hostlink_App_onVPNRevoked(_env: JNIEnv, _class: JClass) {
    if let Some(installed) = installed("onVPNRevoked") {
        installed.inbound.signal_revoked();
    }
}

#[no_mangle]
pub extern "system" fn Java_com_hostlink_App_onActivityResult(
    _env: JNIEnv,
    _class: JClass,
    request_code: jint,
    result_code: jint,
) {
    if let Some(installed) = installed("onActivityResult") {
        route_activity_result(&installed.inbound, request_code, result_code);
    }
}

#[no_mangle]
pub extern "system" fn Java_com_hostlink_App_onWriteStorageGranted(_env: JNIEnv, _class: JClass) {
    if let Some(installed) = installed("onWriteStorageGranted") {
        installed.inbound.signal_storage_permission();
    }
}

#[no_mangle]
pub extern "system" fn Java_com_hostlink_App_onConnectivityChanged(
    _env: JNIEnv,
    _class: JClass,
    connected: jboolean,
) {
    if let Some(installed) = installed("onConnectivityChanged") {
        installed.inbound.signal_connectivity(connected == JNI_TRUE);
    }
}

#[no_mangle]
pub extern "system" fn Java_com_hostlink_App_onActivityAttached(
    env: JNIEnv,
    _class: JClass,
    activity: JObject,
) {
    let Some(installed) = installed("onActivityAttached") else {
        return;
    };
    match installed.handles.pin(&env, &activity, "activity") {
        Ok(handle) => installed.inbound.attach_activity(handle),
        Err(err) => error!(error = %err, "Failed to pin activity"),
    }
}

#[no_mangle]
pub extern "system" fn Java_com_hostlink_HostService_connect(env: JNIEnv, this: JObject) {
    hand_off_service(&env, &this, true);
}

#[no_mangle]
pub extern "system" fn Java_com_hostlink_HostService_disconnect(env: JNIEnv, this: JObject) {
    hand_off_service(&env, &this, false);
}

#[no_mangle]
pub extern "system" fn Java_com_hostlink_App_shutdownBridge(_env: JNIEnv, _class: JClass) {
    if let Some(installed) = installed("shutdownBridge") {
        installed.bridge.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{HostPlatform, HostQuery, HostValue};
    use core_bridge::{BridgeEvent, NullHandler};
    use std::time::Duration;
    use tokio::time::timeout;

    struct QuietHost;

    impl HostPlatform for QuietHost {
        fn call(&self, _query: HostQuery) -> bridge_traits::Result<HostValue> {
            Ok(HostValue::Unit)
        }
    }

    async fn routed(request_code: jint, result_code: jint) -> Vec<BridgeEvent> {
        let config = BridgeConfig::builder()
            .host(Arc::new(QuietHost))
            .build()
            .unwrap();
        let (bridge, inbound) = HostBridge::create(config);
        let bridge = Arc::new(bridge);
        let mut events = bridge.events();

        route_activity_result(&inbound, request_code, result_code);
        let runner = Arc::clone(&bridge);
        let task = tokio::spawn(async move { runner.run(NullHandler).await });

        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        bridge.shutdown();
        timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            if event != BridgeEvent::Stopped {
                seen.push(event);
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_prepare_result_ok_signals_prepared() {
        let events = routed(REQUEST_PREPARE_VPN, RESULT_OK).await;
        assert_eq!(events, vec![BridgeEvent::VpnPrepared]);
    }

    #[tokio::test]
    async fn test_prepare_result_cancelled_signals_closed() {
        let events = routed(REQUEST_PREPARE_VPN, 0).await;
        assert_eq!(events, vec![BridgeEvent::VpnClosed]);
    }

    #[tokio::test]
    async fn test_other_request_codes_are_ignored() {
        let events = routed(core_bridge::REQUEST_SIGNIN, RESULT_OK).await;
        assert!(events.is_empty());
    }
}
