// SPDX-License-Identifier: Apache-2.0

//! One-shot helpers that drive an encoder to completion and gather the
//! chunks into a single buffer.
//!
//! `Ok(None)` means the session produced no output at all, which happens
//! for an absent root. Callers that only ever encode present values can
//! unwrap the option.

use crate::encode_error::EncodeError;
use crate::encoder::JsonEncoder;
use crate::options::EncodeOptions;
use crate::value::Value;
use bytes::{Bytes, BytesMut};
use core::pin::Pin;
use futures_core::Stream;

/// Encode `value` to a single byte buffer.
pub async fn to_bytes(
    value: impl Into<Value>,
    opts: EncodeOptions,
) -> Result<Option<Bytes>, EncodeError> {
    let mut encoder = JsonEncoder::with_options(value, opts);
    let mut out = BytesMut::new();
    let mut produced = false;
    loop {
        let next =
            core::future::poll_fn(|cx| Pin::new(&mut encoder).poll_next(cx)).await;
        match next {
            Some(Ok(chunk)) => {
                produced = true;
                out.extend_from_slice(&chunk);
            }
            Some(Err(err)) => return Err(err),
            None => break,
        }
    }
    Ok(produced.then(|| out.freeze()))
}

/// Encode `value` to a `String`.
///
/// The output of a session without raw fragments is always valid UTF-8;
/// a raw fragment that is not costs an [`EncodeError::InvalidUtf8`] here.
pub async fn to_string(
    value: impl Into<Value>,
    opts: EncodeOptions,
) -> Result<Option<String>, EncodeError> {
    match to_bytes(value, opts).await? {
        Some(bytes) => {
            let text = String::from_utf8(bytes.to_vec())
                .map_err(|e| EncodeError::InvalidUtf8(e.utf8_error()))?;
            Ok(Some(text))
        }
        None => Ok(None),
    }
}
