use std::{
    fs::File,
    io::BufReader,
    net::{SocketAddr, ToSocketAddrs},
    path::Path,
};

use anyhow::{anyhow, Context};
use secrecy::ExposeSecret;
use suppaftp::{
    native_tls::TlsConnector, types::FileType, FtpError, FtpStream, Mode, NativeTlsConnector,
    NativeTlsFtpStream,
};

use super::{Connector, EntryKind, RemoteEntry, RemoteStore, StoreError, StoreResult};
use crate::config::{DeploymentTarget, Scheme};

// SITE command for a server-side recursive delete.
const BULK_DELETE_COMMAND: &str = "RMDIR";

enum Session {
    Plain(FtpStream),
    Secure(NativeTlsFtpStream),
}

macro_rules! with_session {
    ($session:expr, $stream:ident => $body:expr) => {
        match $session {
            Session::Plain($stream) => $body,
            Session::Secure($stream) => $body,
        }
    };
}

pub struct FtpStore {
    session: Session,
}

pub struct FtpConnector;

impl Connector for FtpConnector {
    fn connect(&self, target: &DeploymentTarget) -> anyhow::Result<Box<dyn RemoteStore + Send>> {
        let address = resolve(&target.host, target.port)?;
        info!(
            "Connecting to FTP server {}:{} using {}",
            target.host, target.port, target.scheme
        );

        let mut session = match target.scheme {
            Scheme::Ftp => Session::Plain(FtpStream::connect_timeout(address, target.timeout)?),
            Scheme::Ftps => {
                let tls = NativeTlsConnector::from(TlsConnector::new()?);
                let stream = NativeTlsFtpStream::connect_timeout(address, target.timeout)?
                    .into_secure(tls, &target.host)?;
                Session::Secure(stream)
            }
        };

        with_session!(&mut session, stream => {
            stream.get_ref().set_read_timeout(Some(target.timeout))?;
            stream.get_ref().set_write_timeout(Some(target.timeout))?;
            stream
                .login(target.username.as_str(), target.password.expose_secret())
                .with_context(|| format!("FTP login failed for user {}", target.username))?;
            stream.set_mode(if target.passive { Mode::Passive } else { Mode::Active });
            stream.transfer_type(FileType::Binary)?;
        });

        Ok(Box::new(FtpStore { session }))
    }
}

fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow!("Could not resolve {}:{}", host, port))
}

fn rejected(operation: &'static str, path: &str, error: FtpError) -> StoreError {
    match error {
        FtpError::ConnectionError(e) => StoreError::Io(e),
        other => StoreError::rejected(operation, path, other),
    }
}

// 500-504: syntax error, unknown command or command not implemented.
fn is_not_implemented(error: &FtpError) -> bool {
    match error {
        FtpError::UnexpectedResponse(response) => (500..=504).contains(&response.status.code()),
        _ => false,
    }
}

/// Parses one MLSD line such as `type=dir;modify=20240101120000; logos`.
/// Self and parent entries (`cdir`, `pdir`) yield `None`.
fn parse_mlsd_line(line: &str) -> Option<RemoteEntry> {
    let (facts, name) = line.split_once(' ')?;
    let name = name.trim_end_matches(&['\r', '\n'][..]);
    if name.is_empty() {
        return None;
    }
    let kind = facts
        .split(';')
        .filter_map(|fact| fact.split_once('='))
        .find(|(key, _)| key.eq_ignore_ascii_case("type"))
        .map(|(_, value)| value.to_ascii_lowercase())?;

    let kind = match kind.as_str() {
        "cdir" | "pdir" => return None,
        "dir" => EntryKind::Directory,
        other if other.contains("link") => EntryKind::Link,
        _ => EntryKind::File,
    };
    Some(RemoteEntry {
        name: name.to_owned(),
        kind,
    })
}

impl RemoteStore for FtpStore {
    fn make_directory(&mut self, path: &str) -> StoreResult<()> {
        with_session!(&mut self.session, stream => stream.mkdir(path))
            .map(|_| ())
            .map_err(|e| rejected("MKD", path, e))
    }

    fn is_directory(&mut self, path: &str) -> bool {
        with_session!(&mut self.session, stream => {
            let original = match stream.pwd() {
                Ok(original) => original,
                Err(e) => {
                    debug!("PWD failed while probing {}: {}", path, e);
                    return false;
                }
            };
            if stream.cwd(path).is_err() {
                return false;
            }
            if let Err(e) = stream.cwd(&original) {
                warn!("Could not return to {} after probing {}: {}", original, path, e);
            }
            true
        })
    }

    fn put(&mut self, local: &Path, remote: &str) -> StoreResult<u64> {
        let mut reader = BufReader::new(File::open(local)?);
        with_session!(&mut self.session, stream => stream.put_file(remote, &mut reader))
            .map_err(|e| rejected("STOR", remote, e))
    }

    fn delete_file(&mut self, path: &str) -> StoreResult<()> {
        with_session!(&mut self.session, stream => stream.rm(path))
            .map_err(|e| rejected("DELE", path, e))
    }

    fn remove_directory(&mut self, path: &str) -> StoreResult<()> {
        with_session!(&mut self.session, stream => stream.rmdir(path))
            .map_err(|e| rejected("RMD", path, e))
    }

    fn rename(&mut self, from: &str, to: &str) -> StoreResult<()> {
        with_session!(&mut self.session, stream => stream.rename(from, to))
            .map_err(|e| rejected("RNFR/RNTO", from, e))
    }

    fn list_entries(&mut self, path: &str) -> StoreResult<Vec<RemoteEntry>> {
        let lines = with_session!(&mut self.session, stream => stream.mlsd(Some(path)))
            .map_err(|e| {
                if is_not_implemented(&e) {
                    StoreError::Unsupported
                } else {
                    rejected("MLSD", path, e)
                }
            })?;
        Ok(lines.iter().filter_map(|line| parse_mlsd_line(line)).collect())
    }

    fn list_names(&mut self, path: &str) -> StoreResult<Vec<String>> {
        with_session!(&mut self.session, stream => stream.nlst(Some(path)))
            .map_err(|e| rejected("NLST", path, e))
    }

    fn delete_tree(&mut self, path: &str) -> StoreResult<()> {
        let command = format!("{} {}", BULK_DELETE_COMMAND, path);
        match with_session!(&mut self.session, stream => stream.site(&command)) {
            Ok(_) => Ok(()),
            Err(e) if is_not_implemented(&e) => Err(StoreError::Unsupported),
            Err(e) => Err(rejected("SITE RMDIR", path, e)),
        }
    }

    fn close(&mut self) -> StoreResult<()> {
        with_session!(&mut self.session, stream => stream.quit())
            .map_err(|e| rejected("QUIT", "", e))
    }
}
