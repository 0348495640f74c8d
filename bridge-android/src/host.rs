//! [`HostPlatform`] over JNI.
//!
//! Every [`HostQuery`] becomes one Java method call. Queries that carry a
//! service handle are invoked on that service object; everything else is
//! invoked on the application context, with activities passed as the first
//! argument.

use std::fmt;
use std::sync::Arc;

use bridge_traits::{BridgeError, HostPlatform, HostQuery, HostValue, RawHandle, Result};
use bytes::Bytes;
use jni::objects::{GlobalRef, JByteArray, JObject, JString, JValue, JValueOwned};
use jni::{JNIEnv, JavaVM};
use tracing::{debug, warn};

use crate::handles::HandleTable;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Target {
    App,
    Object(RawHandle),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Arg {
    Text(String),
    Bool(bool),
    Int(i32),
    Object(RawHandle),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Returns {
    Void,
    Bool,
    Int,
    Text,
    Bytes,
}

/// A resolved Java method invocation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MethodCall {
    pub(crate) target: Target,
    pub(crate) name: &'static str,
    pub(crate) signature: &'static str,
    pub(crate) args: Vec<Arg>,
    pub(crate) returns: Returns,
}

impl MethodCall {
    fn on_app(name: &'static str, signature: &'static str, returns: Returns) -> Self {
        Self {
            target: Target::App,
            name,
            signature,
            args: Vec::new(),
            returns,
        }
    }

    fn with_args(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.args.extend(args);
        self
    }
}

pub(crate) fn method_call(query: HostQuery) -> MethodCall {
    let name = query.selector().method_name();
    match query {
        HostQuery::Hostname | HostQuery::OsVersion | HostQuery::ModelName => {
            MethodCall::on_app(name, "()Ljava/lang/String;", Returns::Text)
        }
        HostQuery::InterfacesAsString => {
            MethodCall::on_app(name, "()Ljava/lang/String;", Returns::Text)
        }
        HostQuery::IsTv | HostQuery::IsChromeOs => MethodCall::on_app(name, "()Z", Returns::Bool),
        HostQuery::PackageCertificate => MethodCall::on_app(name, "()[B", Returns::Bytes),
        HostQuery::UpdateStatusNotification {
            service,
            title,
            message,
        }
        | HostQuery::PushNotify {
            service,
            title,
            message,
        } => MethodCall {
            target: Target::Object(service),
            name,
            signature: "(Ljava/lang/String;Ljava/lang/String;)V",
            args: vec![Arg::Text(title), Arg::Text(message)],
            returns: Returns::Void,
        },
        HostQuery::NotifyFile { uri, message } => {
            MethodCall::on_app(name, "(Ljava/lang/String;Ljava/lang/String;)V", Returns::Void)
                .with_args([Arg::Text(uri), Arg::Text(message)])
        }
        HostQuery::SetTileStatus { enabled } => {
            MethodCall::on_app(name, "(Z)V", Returns::Void).with_args([Arg::Bool(enabled)])
        }
        HostQuery::PrepareVpnPermission {
            activity,
            request_code,
        } => MethodCall::on_app(name, "(Landroid/app/Activity;I)V", Returns::Void)
            .with_args([Arg::Object(activity), Arg::Int(request_code)]),
        HostQuery::AttachPeer { activity } => {
            MethodCall::on_app(name, "(Landroid/app/Activity;)V", Returns::Void)
                .with_args([Arg::Object(activity)])
        }
        HostQuery::ShowUrl { activity, url } => MethodCall::on_app(
            name,
            "(Landroid/app/Activity;Ljava/lang/String;)V",
            Returns::Void,
        )
        .with_args([Arg::Object(activity), Arg::Text(url)]),
        HostQuery::OpenFile { uri, mode } => {
            MethodCall::on_app(name, "(Ljava/lang/String;Ljava/lang/String;)I", Returns::Int)
                .with_args([Arg::Text(uri), Arg::Text(mode)])
        }
    }
}

/// Argument kept alive for the duration of a call.
enum Held<'local> {
    Local(JObject<'local>),
    Global(GlobalRef),
    Bool(bool),
    Int(i32),
}

impl Held<'_> {
    fn as_value(&self) -> JValue<'_, '_> {
        match self {
            Held::Local(object) => JValue::Object(object),
            Held::Global(global) => JValue::Object(global.as_obj()),
            Held::Bool(value) => JValue::Bool(u8::from(*value)),
            Held::Int(value) => JValue::Int(*value),
        }
    }
}

/// The Android application seen through JNI.
pub struct AndroidHost {
    vm: JavaVM,
    context: GlobalRef,
    handles: Arc<HandleTable>,
}

impl AndroidHost {
    /// Pin the application context and remember the VM for later calls.
    ///
    /// Must be called on a thread attached to the VM, typically from a JNI
    /// entry point.
    pub fn new(env: &mut JNIEnv, app_context: &JObject, handles: Arc<HandleTable>) -> Result<Self> {
        let vm = env.get_java_vm().map_err(unavailable)?;
        let context = env.new_global_ref(app_context).map_err(unavailable)?;
        Ok(Self {
            vm,
            context,
            handles,
        })
    }

    pub fn handles(&self) -> &Arc<HandleTable> {
        &self.handles
    }

    fn invoke(&self, call: MethodCall) -> Result<HostValue> {
        let mut env = self.vm.attach_current_thread().map_err(unavailable)?;

        let target = match call.target {
            Target::App => self.context.clone(),
            Target::Object(raw) => self.handles.get(raw)?,
        };

        let mut held = Vec::with_capacity(call.args.len());
        for arg in call.args {
            held.push(match arg {
                Arg::Text(text) => match env.new_string(text) {
                    Ok(string) => Held::Local(JObject::from(string)),
                    Err(err) => return Err(call_failed(&mut env, call.name, err)),
                },
                Arg::Object(raw) => Held::Global(self.handles.get(raw)?),
                Arg::Bool(value) => Held::Bool(value),
                Arg::Int(value) => Held::Int(value),
            });
        }
        let args: Vec<JValue> = held.iter().map(Held::as_value).collect();

        let value = match env.call_method(target.as_obj(), call.name, call.signature, &args) {
            Ok(value) => value,
            Err(err) => return Err(call_failed(&mut env, call.name, err)),
        };

        match convert(&mut env, call.returns, value) {
            Ok(value) => Ok(value),
            Err(err) => Err(call_failed(&mut env, call.name, err)),
        }
    }
}

impl HostPlatform for AndroidHost {
    fn call(&self, query: HostQuery) -> Result<HostValue> {
        let call = method_call(query);
        debug!(method = call.name, "Calling host");
        self.invoke(call)
    }
}

impl fmt::Debug for AndroidHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidHost")
            .field("handles", &self.handles)
            .finish_non_exhaustive()
    }
}

fn convert(
    env: &mut JNIEnv,
    returns: Returns,
    value: JValueOwned,
) -> jni::errors::Result<HostValue> {
    Ok(match returns {
        Returns::Void => HostValue::Unit,
        Returns::Bool => HostValue::Bool(value.z()?),
        Returns::Int => HostValue::Fd(value.i()?),
        Returns::Text => {
            let object = value.l()?;
            if object.is_null() {
                HostValue::Text(String::new())
            } else {
                let string = JString::from(object);
                let text: String = env.get_string(&string)?.into();
                HostValue::Text(text)
            }
        }
        Returns::Bytes => {
            let array = JByteArray::from(value.l()?);
            HostValue::Bytes(Bytes::from(env.convert_byte_array(&array)?))
        }
    })
}

fn unavailable(err: jni::errors::Error) -> BridgeError {
    BridgeError::HostUnavailable(err.to_string())
}

/// A thrown Java exception is the host refusing; anything else is the
/// boundary failing.
fn call_failed(env: &mut JNIEnv, method: &str, err: jni::errors::Error) -> BridgeError {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
        warn!(method, "Host method threw");
        return BridgeError::HostRejected(format!("{method} threw: {err}"));
    }
    BridgeError::HostUnavailable(format!("{method}: {err}"))
}
