//! The access layer: where followed links are loaded.
//!
//! The document core only decides *which* address a link leads to. Loading
//! it is the job of an [`Access`] implementation. [`LocalAccess`] serves
//! `file:` addresses from the local file system.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::address;
use crate::error::{Error, Result};
use crate::markup::{self, ReadOptions};
use crate::model::Document;
use crate::style::StyleSheet;

/// Characters escaped in the path of a `file:` address.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A source of documents reachable by address.
pub trait Access {
    /// Short name of the access method, e.g. `file`.
    fn name(&self) -> &str;

    /// Turn a possibly relative `reference` into an absolute address.
    fn resolve_address(&self, base: &str, reference: &str) -> String {
        address::resolve(base, reference)
    }

    /// Load the document at `address`. A fragment selects an anchor within
    /// the document and does not change what is loaded.
    fn load(&mut self, address: &str) -> Result<()>;
}

/// Loads `file:` addresses and keeps every document it has read.
pub struct LocalAccess {
    sheet: StyleSheet,
    loaded: HashMap<String, Document>,
    last: Option<String>,
}

impl LocalAccess {
    pub fn new(sheet: StyleSheet) -> Self {
        Self {
            sheet,
            loaded: HashMap::new(),
            last: None,
        }
    }

    /// Load a local file and return its address.
    pub fn open(&mut self, path: &Path) -> Result<String> {
        let address = file_address(path)?;
        self.load(&address)?;
        Ok(address)
    }

    /// A loaded document, by address (any fragment is ignored).
    pub fn document(&self, address: &str) -> Option<&Document> {
        self.loaded.get(address::split_fragment(address).0)
    }

    /// Address of the most recently requested document.
    pub fn last_loaded(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

impl Access for LocalAccess {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&mut self, address: &str) -> Result<()> {
        let (document_address, _) = address::split_fragment(address);
        self.last = Some(document_address.to_string());
        if self.loaded.contains_key(document_address) {
            log::debug!("{document_address} already loaded");
            return Ok(());
        }

        let path = address_path(document_address)
            .ok_or_else(|| Error::Access(format!("cannot load {address}: not a file address")))?;
        let bytes = fs::read(&path)?;
        let options = ReadOptions {
            address: Some(document_address.to_string()),
            ..Default::default()
        };
        let outcome = markup::read_bytes(&bytes, &self.sheet, &options)?;
        log::debug!(
            "loaded {} ({} bytes, {} diagnostics)",
            path.display(),
            bytes.len(),
            outcome.diagnostics.len()
        );
        self.loaded
            .insert(document_address.to_string(), outcome.document);
        Ok(())
    }
}

/// The `file:` address of a local path, made absolute.
pub fn file_address(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let text = absolute.to_string_lossy().replace('\\', "/");
    let text = if text.starts_with('/') { text } else { format!("/{text}") };
    Ok(format!("file://{}", utf8_percent_encode(&text, PATH)))
}

/// The local path named by a `file:` address.
pub fn address_path(address: &str) -> Option<PathBuf> {
    let rest = address.strip_prefix("file:")?;
    // `file:///path` and `file://localhost/path` name local files.
    let path = match rest.strip_prefix("//") {
        Some(authority_path) => {
            let slash = authority_path.find('/')?;
            let host = &authority_path[..slash];
            if !host.is_empty() && !host.eq_ignore_ascii_case("localhost") {
                return None;
            }
            &authority_path[slash..]
        }
        None => rest,
    };
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    Some(PathBuf::from(decoded.as_ref()))
}
