use std::fs;
use std::io;
use std::path::Path;

use super::SamplingState;

pub const MAGIC: &[u8; 4] = b"IMSS";
pub const VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1;

impl SamplingState {
    /// Magic, version byte, then the bincode body.
    pub fn to_bytes(&self) -> Result<Vec<u8>, io::Error> {
        let body = bincode::serialize(self).map_err(io::Error::other)?;
        let mut buf = Vec::with_capacity(HEADER_LEN + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, io::Error> {
        let invalid = |msg: &str| io::Error::new(io::ErrorKind::InvalidData, msg.to_string());
        if bytes.len() < HEADER_LEN {
            return Err(invalid("sampling state too short"));
        }
        let (header, body) = bytes.split_at(HEADER_LEN);
        if &header[..MAGIC.len()] != MAGIC {
            return Err(invalid("not a sampling state file"));
        }
        if header[MAGIC.len()] != VERSION {
            return Err(invalid("unsupported sampling state version"));
        }
        bincode::deserialize(body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Store the accumulator for the next session. The file is replaced
    /// only once the new state is fully on disk.
    pub fn save(&self, path: &Path) -> Result<(), io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = path.with_extension("partial");
        fs::write(&partial, self.to_bytes()?)?;
        fs::rename(&partial, path)
    }

    /// Read a checkpoint. No file yet means no block has been ranked, so
    /// the session starts stateless.
    pub fn open(path: &Path) -> Result<Self, io::Error> {
        match fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::Stateless),
            Err(e) => Err(e),
        }
    }
}
