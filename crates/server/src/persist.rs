//! File-per-player persistence with zstd compression.
//!
//! Each player lives in `p_<id>.gsv`: a 14-byte header (magic, version,
//! CRC32 of the payload, payload length) followed by a zstd-compressed
//! bincode [`PlayerRecord`]. Writes land in a temp file that is renamed over
//! the old one.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use crc32fast::Hasher;
use grove_core::PlayerId;
use tracing::{info, warn};

use crate::{PlayerRecord, PlayerStore, StoreError};

/// Magic number for save files ("GRVS").
const SAVE_MAGIC: u32 = 0x4752_5653;

/// Current save format version.
const SAVE_VERSION: u16 = 1;

const HEADER_LEN: usize = 14;

/// Save file header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SaveHeader {
    magic: u32,
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl SaveHeader {
    fn new(crc32: u32, payload_len: u32) -> Self {
        Self {
            magic: SAVE_MAGIC,
            version: SAVE_VERSION,
            crc32,
            payload_len,
        }
    }

    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..10].copy_from_slice(&self.crc32.to_le_bytes());
        bytes[10..14].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < HEADER_LEN {
            return Err(StoreError::Corrupt("save header too short".into()));
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != SAVE_MAGIC {
            return Err(StoreError::Corrupt(format!(
                "invalid save magic: expected 0x{SAVE_MAGIC:08X}, got 0x{magic:08X}"
            )));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != SAVE_VERSION {
            return Err(StoreError::Corrupt(format!("unsupported save version {version}")));
        }
        Ok(Self {
            magic,
            version,
            crc32: u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
            payload_len: u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]),
        })
    }
}

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Encode a record into the on-disk format.
pub fn encode_record(record: &PlayerRecord) -> Result<Vec<u8>, StoreError> {
    let serialized = bincode::serialize(record)?;
    // level 3 matches zstd's default speed/ratio trade-off
    let compressed = zstd::encode_all(&serialized[..], 3)?;
    let payload_len = u32::try_from(compressed.len())
        .map_err(|_| StoreError::Corrupt("record too large".into()))?;
    let header = SaveHeader::new(checksum(&compressed), payload_len);

    let mut bytes = Vec::with_capacity(HEADER_LEN + compressed.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

/// Decode a record, validating header, length and CRC.
pub fn decode_record(bytes: &[u8]) -> Result<PlayerRecord, StoreError> {
    let header = SaveHeader::from_bytes(bytes)?;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != header.payload_len as usize {
        return Err(StoreError::Corrupt(format!(
            "payload length mismatch: header says {}, file has {}",
            header.payload_len,
            payload.len()
        )));
    }
    let computed = checksum(payload);
    if computed != header.crc32 {
        return Err(StoreError::Corrupt(format!(
            "CRC32 mismatch: expected {:08X}, got {computed:08X}",
            header.crc32
        )));
    }
    let decompressed = zstd::decode_all(payload)?;
    Ok(bincode::deserialize(&decompressed)?)
}

/// Directory of per-player save files.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    referral_index: Mutex<HashMap<String, PlayerId>>,
}

impl FileStore {
    /// Open (creating if needed) a save directory and index its referral
    /// codes. Unreadable files are skipped with a warning.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let mut index = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("gsv") {
                continue;
            }
            match fs::read(&path).map_err(StoreError::from).and_then(|b| decode_record(&b)) {
                Ok(record) => {
                    index.insert(record.state.referral.code.clone(), record.profile.player_id);
                }
                Err(err) => warn!(path = %path.display(), %err, "skipping unreadable save"),
            }
        }
        info!(dir = %dir.display(), players = index.len(), "file store opened");
        Ok(Self {
            dir,
            referral_index: Mutex::new(index),
        })
    }

    fn path_for(&self, player: PlayerId) -> PathBuf {
        self.dir.join(format!("p_{}.gsv", player.0))
    }

    fn index(&self) -> MutexGuard<'_, HashMap<String, PlayerId>> {
        self.referral_index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PlayerStore for FileStore {
    async fn load(&self, player: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        let path = self.path_for(player);
        match tokio::fs::read(&path).await {
            Ok(bytes) => decode_record(&bytes).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        let bytes = encode_record(record)?;
        let path = self.path_for(record.profile.player_id);
        let tmp = path.with_extension("gsv.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        self.index()
            .insert(record.state.referral.code.clone(), record.profile.player_id);
        Ok(())
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<PlayerId>, StoreError> {
        Ok(self.index().get(code).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Profile;
    use grove_catalog::Catalog;
    use grove_core::Millis;
    use grove_engine::GameState;

    fn record(id: u64, code: &str) -> PlayerRecord {
        let catalog = Catalog::builtin().unwrap();
        PlayerRecord {
            profile: Profile {
                player_id: PlayerId(id),
                display_name: format!("p{id}"),
                language: "en".into(),
            },
            state: GameState::new_player(&catalog, PlayerId(id), code.into(), Millis(1_000)),
        }
    }

    #[test]
    fn save_header_roundtrip() {
        let header = SaveHeader::new(0xDEADBEEF, 1234);
        let decoded = SaveHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn encoded_record_decodes_identically() {
        let original = record(3, "CODE0003");
        let bytes = encode_record(&original).unwrap();
        assert_eq!(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), SAVE_MAGIC);
        assert_eq!(decode_record(&bytes).unwrap(), original);
    }

    #[test]
    fn flipped_payload_byte_fails_crc() {
        let mut bytes = encode_record(&record(3, "CODE0003")).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(decode_record(&bytes), Err(StoreError::Corrupt(msg)) if msg.contains("CRC32")));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = encode_record(&record(3, "CODE0003")).unwrap();
        bytes[0] = 0;
        assert!(matches!(decode_record(&bytes), Err(StoreError::Corrupt(_))));
        assert!(matches!(decode_record(&bytes[..5]), Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn save_load_and_reindex_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            assert_eq!(store.load(PlayerId(5)).await.unwrap(), None);
            store.save(&record(5, "FIVE0005")).await.unwrap();
            store.save(&record(6, "SIXX0006")).await.unwrap();
            assert!(dir.path().join("p_5.gsv").exists());
            assert!(!dir.path().join("p_5.gsv.tmp").exists());
        }
        fs::write(dir.path().join("p_9.gsv"), b"garbage").unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.load(PlayerId(5)).await.unwrap(), Some(record(5, "FIVE0005")));
        assert_eq!(
            reopened.find_by_referral_code("SIXX0006").await.unwrap(),
            Some(PlayerId(6))
        );
        assert!(reopened.load(PlayerId(9)).await.is_err());
    }
}
