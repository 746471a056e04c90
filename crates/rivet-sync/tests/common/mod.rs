//! In-memory remote store shared by the engine tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use rivet_core::config::{ConfigBuilder, TransferConfig};
use rivet_core::domain::RemoteId;
use rivet_core::ports::{IRemoteStore, RemoteFile, RemoteObject, UploadSession};
use rivet_sync::SyncEngine;

/// One call made through the port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetFolder(RemoteId),
    CreateFolder { parent: RemoteId, name: String },
    CreateItem { folder: RemoteId, name: String },
    ItemFiles(RemoteId),
    ListFolders { parent: RemoteId, offset: u64, limit: u32 },
    ListItems { folder: RemoteId, offset: u64, limit: u32 },
    CreateUpload { item: RemoteId, name: String, size: u64 },
    ReplaceContents { file: RemoteId, size: u64 },
    UploadChunk { upload: RemoteId, offset: u64, len: usize },
    Download(RemoteId),
}

struct FakeFolder {
    name: String,
    parent: Option<RemoteId>,
}

struct FakeItem {
    name: String,
    folder: RemoteId,
    files: Vec<RemoteId>,
}

struct FakeFile {
    data: Vec<u8>,
}

enum UploadTarget {
    NewFile { item: RemoteId },
    Existing { file: RemoteId },
}

struct FakeUpload {
    target: UploadTarget,
    item_name: String,
    size: u64,
    data: Vec<u8>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    folders: HashMap<RemoteId, FakeFolder>,
    folder_order: Vec<RemoteId>,
    items: HashMap<RemoteId, FakeItem>,
    item_order: Vec<RemoteId>,
    files: HashMap<RemoteId, FakeFile>,
    uploads: HashMap<RemoteId, FakeUpload>,
    calls: Vec<Call>,
    failing_folders: HashSet<String>,
    failing_listings: HashSet<RemoteId>,
    failing_items: HashSet<String>,
    failing_chunks: HashSet<String>,
}

impl State {
    fn mint(&mut self, prefix: &str) -> RemoteId {
        self.next_id += 1;
        RemoteId::new(format!("{prefix}{:06}", self.next_id)).unwrap()
    }

    fn finish_upload(&mut self, upload_id: &RemoteId) {
        let Some(upload) = self.uploads.remove(upload_id) else {
            return;
        };
        match upload.target {
            UploadTarget::NewFile { item } => {
                let file = self.mint("file");
                self.files.insert(file.clone(), FakeFile { data: upload.data });
                if let Some(item) = self.items.get_mut(&item) {
                    item.files.push(file);
                }
            }
            UploadTarget::Existing { file } => {
                self.files.insert(file, FakeFile { data: upload.data });
            }
        }
    }
}

/// Remote store kept entirely in memory
///
/// Folder and item creation reuse an existing child with the same name,
/// every call is recorded, and folders can be set up to fail by name.
pub struct FakeRemoteStore {
    root: RemoteId,
    state: Mutex<State>,
}

impl FakeRemoteStore {
    pub fn new() -> Arc<Self> {
        let mut state = State::default();
        let root = state.mint("root");
        state.folders.insert(
            root.clone(),
            FakeFolder {
                name: "root".to_string(),
                parent: None,
            },
        );
        state.folder_order.push(root.clone());
        Arc::new(Self {
            root,
            state: Mutex::new(state),
        })
    }

    pub fn root(&self) -> RemoteId {
        self.root.clone()
    }

    /// Make every `create_folder` with this name fail
    pub fn fail_folder(&self, name: &str) {
        self.state.lock().unwrap().failing_folders.insert(name.to_string());
    }

    /// Make listing the children of `folder` fail
    pub fn fail_listing(&self, folder: &RemoteId) {
        self.state.lock().unwrap().failing_listings.insert(folder.clone());
    }

    /// Make every `create_item` with this name fail
    pub fn fail_item(&self, name: &str) {
        self.state.lock().unwrap().failing_items.insert(name.to_string());
    }

    /// Reject every chunk sent to an upload for the item with this name
    pub fn fail_chunks(&self, item_name: &str) {
        self.state.lock().unwrap().failing_chunks.insert(item_name.to_string());
    }

    /// Add a folder without recording a call
    pub fn add_folder(&self, parent: &RemoteId, name: &str) -> RemoteId {
        let mut state = self.state.lock().unwrap();
        let id = state.mint("folder");
        state.folders.insert(
            id.clone(),
            FakeFolder {
                name: name.to_string(),
                parent: Some(parent.clone()),
            },
        );
        state.folder_order.push(id.clone());
        id
    }

    /// Add an item holding one file per blob, without recording a call
    pub fn add_item(&self, folder: &RemoteId, name: &str, blobs: &[&[u8]]) -> RemoteId {
        let mut state = self.state.lock().unwrap();
        let id = state.mint("item");
        let mut files = Vec::new();
        for blob in blobs {
            let file = state.mint("file");
            state.files.insert(file.clone(), FakeFile { data: blob.to_vec() });
            files.push(file);
        }
        state.items.insert(
            id.clone(),
            FakeItem {
                name: name.to_string(),
                folder: folder.clone(),
                files,
            },
        );
        state.item_order.push(id.clone());
        id
    }

    pub fn find_folder(&self, parent: &RemoteId, name: &str) -> Option<RemoteId> {
        let state = self.state.lock().unwrap();
        state
            .folder_order
            .iter()
            .find(|id| {
                let f = &state.folders[*id];
                f.parent.as_ref() == Some(parent) && f.name == name
            })
            .cloned()
    }

    pub fn find_item(&self, folder: &RemoteId, name: &str) -> Option<RemoteId> {
        let state = self.state.lock().unwrap();
        state
            .item_order
            .iter()
            .find(|id| {
                let i = &state.items[*id];
                &i.folder == folder && i.name == name
            })
            .cloned()
    }

    pub fn folder_count(&self) -> usize {
        self.state.lock().unwrap().folders.len()
    }

    /// Contents of every file in `item`, in upload order
    pub fn item_contents(&self, item: &RemoteId) -> Vec<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.items[item]
            .files
            .iter()
            .map(|f| state.files[f].data.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl IRemoteStore for FakeRemoteStore {
    async fn get_folder(&self, id: &RemoteId) -> Result<RemoteObject> {
        self.record(Call::GetFolder(id.clone()));
        let state = self.state.lock().unwrap();
        let folder = state
            .folders
            .get(id)
            .ok_or_else(|| anyhow!("Invalid folder id ({id})."))?;
        Ok(RemoteObject {
            id: id.clone(),
            name: folder.name.clone(),
        })
    }

    async fn create_folder(&self, parent: &RemoteId, name: &str) -> Result<RemoteObject> {
        self.record(Call::CreateFolder {
            parent: parent.clone(),
            name: name.to_string(),
        });
        let mut state = self.state.lock().unwrap();
        if state.failing_folders.contains(name) {
            bail!("Access denied for folder {name}.");
        }
        if !state.folders.contains_key(parent) {
            bail!("Invalid folder id ({parent}).");
        }
        let existing = state
            .folder_order
            .iter()
            .find(|id| {
                let f = &state.folders[*id];
                f.parent.as_ref() == Some(parent) && f.name == name
            })
            .cloned();
        let id = match existing {
            Some(id) => id,
            None => {
                let id = state.mint("folder");
                state.folders.insert(
                    id.clone(),
                    FakeFolder {
                        name: name.to_string(),
                        parent: Some(parent.clone()),
                    },
                );
                state.folder_order.push(id.clone());
                id
            }
        };
        Ok(RemoteObject {
            id,
            name: name.to_string(),
        })
    }

    async fn create_item(&self, folder: &RemoteId, name: &str) -> Result<RemoteObject> {
        self.record(Call::CreateItem {
            folder: folder.clone(),
            name: name.to_string(),
        });
        let mut state = self.state.lock().unwrap();
        if state.failing_items.contains(name) {
            bail!("Access denied for item {name}.");
        }
        if !state.folders.contains_key(folder) {
            bail!("Invalid folder id ({folder}).");
        }
        let existing = state
            .item_order
            .iter()
            .find(|id| {
                let i = &state.items[*id];
                &i.folder == folder && i.name == name
            })
            .cloned();
        let id = match existing {
            Some(id) => id,
            None => {
                let id = state.mint("item");
                state.items.insert(
                    id.clone(),
                    FakeItem {
                        name: name.to_string(),
                        folder: folder.clone(),
                        files: Vec::new(),
                    },
                );
                state.item_order.push(id.clone());
                id
            }
        };
        Ok(RemoteObject {
            id,
            name: name.to_string(),
        })
    }

    async fn item_files(&self, item: &RemoteId) -> Result<Vec<RemoteFile>> {
        self.record(Call::ItemFiles(item.clone()));
        let state = self.state.lock().unwrap();
        let item = state
            .items
            .get(item)
            .ok_or_else(|| anyhow!("Invalid item id ({item})."))?;
        Ok(item
            .files
            .iter()
            .map(|f| RemoteFile {
                id: f.clone(),
                size: state.files[f].data.len() as u64,
            })
            .collect())
    }

    async fn list_folders(
        &self,
        parent: &RemoteId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<RemoteObject>> {
        self.record(Call::ListFolders {
            parent: parent.clone(),
            offset,
            limit,
        });
        let state = self.state.lock().unwrap();
        if state.failing_listings.contains(parent) {
            bail!("Read access denied for folder {parent}.");
        }
        Ok(state
            .folder_order
            .iter()
            .filter(|id| state.folders[*id].parent.as_ref() == Some(parent))
            .skip(offset as usize)
            .take(limit as usize)
            .map(|id| RemoteObject {
                id: id.clone(),
                name: state.folders[id].name.clone(),
            })
            .collect())
    }

    async fn list_items(
        &self,
        folder: &RemoteId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<RemoteObject>> {
        self.record(Call::ListItems {
            folder: folder.clone(),
            offset,
            limit,
        });
        let state = self.state.lock().unwrap();
        if state.failing_listings.contains(folder) {
            bail!("Read access denied for folder {folder}.");
        }
        Ok(state
            .item_order
            .iter()
            .filter(|id| &state.items[*id].folder == folder)
            .skip(offset as usize)
            .take(limit as usize)
            .map(|id| RemoteObject {
                id: id.clone(),
                name: state.items[id].name.clone(),
            })
            .collect())
    }

    async fn create_upload(&self, item: &RemoteId, name: &str, size: u64) -> Result<UploadSession> {
        self.record(Call::CreateUpload {
            item: item.clone(),
            name: name.to_string(),
            size,
        });
        let mut state = self.state.lock().unwrap();
        let Some(item_name) = state.items.get(item).map(|i| i.name.clone()) else {
            bail!("Invalid item id ({item}).");
        };
        let id = state.mint("upload");
        state.uploads.insert(
            id.clone(),
            FakeUpload {
                target: UploadTarget::NewFile { item: item.clone() },
                item_name,
                size,
                data: Vec::new(),
            },
        );
        if size == 0 {
            state.finish_upload(&id);
        }
        Ok(UploadSession { id })
    }

    async fn replace_contents(&self, file: &RemoteId, size: u64) -> Result<UploadSession> {
        self.record(Call::ReplaceContents {
            file: file.clone(),
            size,
        });
        let mut state = self.state.lock().unwrap();
        if !state.files.contains_key(file) {
            bail!("Invalid file id ({file}).");
        }
        let item_name = state
            .items
            .values()
            .find(|i| i.files.contains(file))
            .map(|i| i.name.clone())
            .unwrap_or_default();
        let id = state.mint("upload");
        state.uploads.insert(
            id.clone(),
            FakeUpload {
                target: UploadTarget::Existing { file: file.clone() },
                item_name,
                size,
                data: Vec::new(),
            },
        );
        if size == 0 {
            state.finish_upload(&id);
        }
        Ok(UploadSession { id })
    }

    async fn upload_chunk(&self, upload: &RemoteId, offset: u64, data: Vec<u8>) -> Result<()> {
        self.record(Call::UploadChunk {
            upload: upload.clone(),
            offset,
            len: data.len(),
        });
        let mut state = self.state.lock().unwrap();
        let failing = state
            .uploads
            .get(upload)
            .is_some_and(|u| state.failing_chunks.contains(&u.item_name));
        if failing {
            bail!("Chunk rejected for upload {upload}.");
        }
        let session = state
            .uploads
            .get_mut(upload)
            .ok_or_else(|| anyhow!("Invalid upload id ({upload})."))?;
        if offset != session.data.len() as u64 {
            bail!(
                "Server has received {} bytes, but client sent offset {offset}.",
                session.data.len()
            );
        }
        session.data.extend_from_slice(&data);
        if session.data.len() as u64 > session.size {
            bail!("Received too many bytes.");
        }
        if session.data.len() as u64 == session.size {
            state.finish_upload(upload);
        }
        Ok(())
    }

    async fn download_item(&self, item: &RemoteId, dest: &Path) -> Result<u64> {
        self.record(Call::Download(item.clone()));
        let data = {
            let state = self.state.lock().unwrap();
            let item = state
                .items
                .get(item)
                .ok_or_else(|| anyhow!("Invalid item id ({item})."))?;
            let [file] = item.files.as_slice() else {
                bail!("Item does not hold exactly one file.");
            };
            state.files[file].data.clone()
        };
        tokio::fs::write(dest, &data).await?;
        Ok(data.len() as u64)
    }
}

/// Transfer settings with a small worker pool
pub fn transfer(chunk_size: u64) -> TransferConfig {
    ConfigBuilder::new()
        .chunk_size(chunk_size)
        .workers(4)
        .build()
        .transfer
}

pub fn engine(store: &Arc<FakeRemoteStore>, config: TransferConfig) -> SyncEngine {
    let store: Arc<dyn IRemoteStore> = store.clone();
    SyncEngine::new(store, config).unwrap()
}

/// Write `contents` at `root/rel`, creating parent directories
pub fn write_file(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
