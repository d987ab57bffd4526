use std::{
    io,
    net::{SocketAddr, ToSocketAddrs},
    path::Path,
};

use ethtrace_common::types::{ChainFile, ChainFileError, Genesis, GenesisError};

pub fn read_genesis_file(genesis_file_path: &str) -> Result<Genesis, GenesisError> {
    Genesis::try_from(Path::new(genesis_file_path))
}

pub fn read_chain_file(chain_file_path: &str) -> Result<ChainFile, ChainFileError> {
    ChainFile::try_from(Path::new(chain_file_path))
}

pub fn parse_socket_addr(addr: &str, port: &str) -> io::Result<SocketAddr> {
    // NOTE: this blocks until hostname can be resolved
    format!("{addr}:{port}")
        .to_socket_addrs()?
        .next()
        .ok_or(io::Error::new(
            io::ErrorKind::NotFound,
            "Failed to parse socket address",
        ))
}
