//! # Android Bridge Implementation
//!
//! JNI adapter between an Android application and the bridge core.
//!
//! ## Overview
//!
//! - [`AndroidHost`] implements `HostPlatform` by calling Java methods on the
//!   application context or on a pinned service object
//! - [`HandleTable`] pins Java objects as global references and releases them
//!   when the owning `HostHandle` is dropped
//! - `Java_com_hostlink_*` entry points forward host callbacks to the bridge
//!   installed by [`launch`]
//! - [`LogcatSink`] mirrors bridge logs into logcat
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_android::{launch, LogcatSink};
//! use bridge_traits::LogLevel;
//! use core_runtime::logging::{init_logging, LoggingConfig};
//!
//! #[no_mangle]
//! pub extern "system" fn Java_com_example_App_initNative(
//!     mut env: JNIEnv,
//!     _class: JClass,
//!     context: JObject,
//! ) {
//!     let sink = LogcatSink::install("hostlink", LogLevel::Info);
//!     let _ = init_logging(LoggingConfig::default().with_logger_sink(Arc::new(sink)));
//!
//!     if let Err(err) = launch(&mut env, &context, |config| config, MyHandler::default()) {
//!         tracing::error!(error = %err, "Bridge launch failed");
//!     }
//! }
//! ```

mod entry;
mod handles;
mod host;
mod logcat;

pub use entry::{launch, RESULT_OK};
pub use handles::HandleTable;
pub use host::AndroidHost;
pub use logcat::LogcatSink;
