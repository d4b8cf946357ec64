// src/utils/registry.rs

use std::fmt;

use anyhow::{Context, Result};
use winreg::{
    enums::{
        RegType::{REG_DWORD, REG_EXPAND_SZ, REG_SZ},
        HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS,
        KEY_READ, KEY_WRITE,
    },
    RegKey,
};

/// The registry value shapes the engine reads and writes. Everything else
/// (binary blobs, multi-strings) is treated as absent.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RegistryValue {
    Dword(u32),
    Text(String),
}

impl fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryValue::Dword(v) => write!(f, "{:#x}", v),
            RegistryValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Splits a full path like `HKEY_LOCAL_MACHINE\Software\...` into the hive
/// and the subkey below it.
pub fn parse_registry_path(path: &str) -> Result<(RegKey, String)> {
    let components: Vec<&str> = path.split('\\').collect();
    if components.len() < 2 {
        anyhow::bail!(
            "Invalid registry path: '{}'. Expected format 'HKEY_*\\Subkey\\...'",
            path
        );
    }
    let hive = match components[0].to_uppercase().as_str() {
        "HKEY_LOCAL_MACHINE" => HKEY_LOCAL_MACHINE,
        "HKEY_CURRENT_USER" => HKEY_CURRENT_USER,
        "HKEY_CLASSES_ROOT" => HKEY_CLASSES_ROOT,
        "HKEY_USERS" => HKEY_USERS,
        "HKEY_CURRENT_CONFIG" => HKEY_CURRENT_CONFIG,
        other => anyhow::bail!("Unsupported registry hive: '{}'", other),
    };
    let key = components[1..].join("\\");
    Ok((RegKey::predef(hive), key))
}

/// Reads a value under `path`. `Ok(None)` when the subkey or value does not
/// exist, or when the value has a type this module does not handle.
pub fn read_value(path: &str, name: &str) -> Result<Option<RegistryValue>> {
    let (hive, subkey_path) =
        parse_registry_path(path).with_context(|| format!("Bad registry path '{}'", path))?;

    let subkey = match hive.open_subkey_with_flags(&subkey_path, KEY_READ) {
        Ok(key) => key,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open subkey '{}'", subkey_path))
        }
    };

    match subkey.get_raw_value(name) {
        Ok(raw) => decode(&raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::anyhow!("Failed to read value '{}': {}", name, e)),
    }
}

/// Writes a value under `path`, creating intermediate keys as needed.
pub fn set_value(path: &str, name: &str, value: &RegistryValue) -> Result<()> {
    let (hive, subkey_path) =
        parse_registry_path(path).with_context(|| format!("Bad registry path '{}'", path))?;

    let (key, _) = hive
        .create_subkey(&subkey_path)
        .with_context(|| format!("Failed to create or open subkey '{}'", subkey_path))?;

    match value {
        RegistryValue::Dword(v) => key
            .set_value(name, v)
            .with_context(|| format!("Failed to set DWORD value '{}' to {}", name, v)),
        RegistryValue::Text(s) => key
            .set_value(name, s)
            .with_context(|| format!("Failed to set string value '{}' to '{}'", name, s)),
    }
}

/// Deletes a value under `path`. A value or subkey that is already gone
/// counts as success.
pub fn delete_value(path: &str, name: &str) -> Result<()> {
    let (hive, subkey_path) =
        parse_registry_path(path).with_context(|| format!("Bad registry path '{}'", path))?;

    let subkey = match hive.open_subkey_with_flags(&subkey_path, KEY_WRITE) {
        Ok(key) => key,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open subkey '{}'", subkey_path))
        }
    };

    match subkey.delete_value(name) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::anyhow!(
            "Failed to delete registry entry '{}' in '{}': {}",
            name,
            subkey_path,
            e
        )),
    }
}

/// Every decodable value directly under `path`, in registry order. A missing
/// subkey yields an empty list.
pub fn list_values(path: &str) -> Result<Vec<(String, RegistryValue)>> {
    let (hive, subkey_path) =
        parse_registry_path(path).with_context(|| format!("Bad registry path '{}'", path))?;

    let subkey = match hive.open_subkey_with_flags(&subkey_path, KEY_READ) {
        Ok(key) => key,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open subkey '{}'", subkey_path))
        }
    };

    let mut values = Vec::new();
    for entry in subkey.enum_values() {
        let (name, raw) =
            entry.with_context(|| format!("Failed to enumerate values of '{}'", subkey_path))?;
        if let Some(value) = decode(&raw)? {
            values.push((name, value));
        }
    }
    Ok(values)
}

/// Names of the immediate child keys of `path`. A missing subkey yields an
/// empty list.
pub fn list_subkeys(path: &str) -> Result<Vec<String>> {
    let (hive, subkey_path) =
        parse_registry_path(path).with_context(|| format!("Bad registry path '{}'", path))?;

    let subkey = match hive.open_subkey_with_flags(&subkey_path, KEY_READ) {
        Ok(key) => key,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open subkey '{}'", subkey_path))
        }
    };

    subkey
        .enum_keys()
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Failed to enumerate subkeys of '{}'", subkey_path))
}

fn decode(raw: &winreg::RegValue) -> Result<Option<RegistryValue>> {
    match raw.vtype {
        REG_DWORD => {
            let bytes: [u8; 4] = raw
                .bytes
                .get(..4)
                .and_then(|b| b.try_into().ok())
                .context("REG_DWORD data too small")?;
            Ok(Some(RegistryValue::Dword(u32::from_le_bytes(bytes))))
        }
        REG_SZ | REG_EXPAND_SZ => {
            let wide: Vec<u16> = raw
                .bytes
                .chunks_exact(2)
                .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
                .collect();
            let text = String::from_utf16_lossy(&wide)
                .trim_end_matches('\0')
                .to_string();
            Ok(Some(RegistryValue::Text(text)))
        }
        _ => Ok(None),
    }
}
