//! The sandbox's only permitted I/O: an `axios`-shaped HTTP capability.
//!
//! Handler code runs inside a `boa_engine::Context`, which is `!Send` and must stay on
//! the thread that created it — there is no way to `.await` a `reqwest` call from inside a
//! native function callback. Instead the callback calls [`tokio::task::block_in_place`] to
//! step off the async executor's cooperative scheduling for this thread, then blocks on
//! the ambient runtime with [`tokio::runtime::Handle::block_on`]. This is the same
//! capability other collaborators in this workspace bridge a synchronous call surface
//! into an async HTTP client, inverted: here the *caller* (boa) is synchronous and the
//! *callee* (reqwest) is async, rather than the other way around.

use boa_engine::object::builtins::JsPromise;
use boa_engine::object::FunctionObjectBuilder;
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsArgs, JsError, JsNativeError, JsResult, JsValue, NativeFunction};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::debug;

/// Registers the `axios` global: an object exposing `axios.request(config)`, mirroring
/// the subset of the real axios API handlers are expected to use — `{method, url, data,
/// headers}` in, `{status, data, headers}` out.
pub fn register_axios(context: &mut Context) -> JsResult<()> {
    let request_fn = FunctionObjectBuilder::new(context.realm(), NativeFunction::from_fn_ptr(axios_request))
        .name("request")
        .length(1)
        .build();

    let axios = boa_engine::JsObject::with_object_proto(context.intrinsics());
    axios.set(js_string!("request"), request_fn, false, context)?;

    context.register_global_property(js_string!("axios"), axios, Attribute::READONLY)?;
    Ok(())
}

fn axios_request(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let config = args.get_or_undefined(0);
    let config_json = config.to_json(context)?;

    let method = config_json.get("method").and_then(Value::as_str).unwrap_or("GET").to_string();
    let url = config_json
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| JsNativeError::typ().with_message("axios.request requires a `url`"))?
        .to_string();
    let body = config_json.get("data").cloned();
    let headers = config_json.get("headers").cloned();

    let response_json = run_blocking_request(&method, &url, body, headers).map_err(|err| JsError::from_native(JsNativeError::error().with_message(err.to_string())))?;

    JsValue::from_json(&response_json, context)
}

fn run_blocking_request(method: &str, url: &str, body: Option<Value>, headers: Option<Value>) -> anyhow::Result<Value> {
    debug!(%method, %url, "handler issued axios request");

    tokio::task::block_in_place(|| {
        Handle::current().block_on(async move {
            let client = reqwest::Client::new();
            let method = reqwest::Method::from_bytes(method.as_bytes()).unwrap_or(reqwest::Method::GET);
            let mut request = client.request(method, url);

            if let Some(Value::Object(header_map)) = headers {
                for (key, value) in header_map {
                    if let Some(value) = value.as_str() {
                        request = request.header(key, value);
                    }
                }
            }
            if let Some(body) = body {
                request = request.json(&body);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();
            let data: Value = response.json().await.unwrap_or(Value::Null);

            Ok(serde_json::json!({"status": status, "data": data}))
        })
    })
}

/// Drives a handler's returned value to completion. `async function handle` always
/// returns a promise even when its body never actually suspends; [`JsPromise::await_blocking`]
/// drains the microtask queue until it settles since the sandbox has no external event
/// loop of its own.
pub fn await_promise(value: JsValue, context: &mut Context) -> JsResult<JsValue> {
    let Some(object) = value.as_object() else {
        return Ok(value);
    };

    match JsPromise::from_object(object.clone()) {
        Ok(promise) => promise.await_blocking(context),
        Err(_) => Ok(value),
    }
}
