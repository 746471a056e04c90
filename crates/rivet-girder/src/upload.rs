//! Upload operations for Girder
//!
//! Blob content goes up in three steps:
//! - [`create_upload`] or [`replace_contents`] opens an upload session sized
//!   to the final byte count
//! - [`upload_chunk`] sends each chunk with its explicit offset
//! - the server finalizes the file once the received bytes reach the size
//!
//! A zero-byte upload is complete as soon as the session is opened.

use reqwest::Method;
use rivet_core::domain::newtypes::RemoteId;
use rivet_core::ports::UploadSession;
use tracing::debug;

use crate::client::{check_status, GirderClient};
use crate::GirderError;

/// Opens an upload session for a new file inside an item
///
/// `POST file?parentId=<item>&name=<name>&parentType=item&size=<size>`
pub async fn create_upload(
    client: &GirderClient,
    item: &RemoteId,
    name: &str,
    size: u64,
) -> Result<UploadSession, GirderError> {
    let size = size.to_string();
    client
        .post_json(
            "file",
            &[
                ("parentId", item.as_str()),
                ("name", name),
                ("parentType", "item"),
                ("size", &size),
            ],
        )
        .await
}

/// Opens an upload session that replaces the contents of an existing file
///
/// `PUT file/<file>/contents?size=<size>`
pub async fn replace_contents(
    client: &GirderClient,
    file: &RemoteId,
    size: u64,
) -> Result<UploadSession, GirderError> {
    let size = size.to_string();
    client
        .put_json(&format!("file/{file}/contents"), &[("size", &size)])
        .await
}

/// Sends one chunk of an upload session
///
/// `POST file/chunk?uploadId=<upload>&offset=<offset>` with the raw bytes as
/// the body. The response body (the upload or the finished file) is ignored.
pub async fn upload_chunk(
    client: &GirderClient,
    upload: &RemoteId,
    offset: u64,
    data: Vec<u8>,
) -> Result<(), GirderError> {
    let len = data.len();
    let offset_str = offset.to_string();
    let url = client.url(
        "file/chunk",
        &[("uploadId", upload.as_str()), ("offset", &offset_str)],
    )?;
    let request = client.request(Method::POST, url).body(data);
    let response = client.execute(request).await?;
    check_status(response).await?;
    debug!(upload = %upload, offset, bytes = len, "chunk accepted");
    Ok(())
}
