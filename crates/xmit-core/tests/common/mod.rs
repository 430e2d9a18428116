//! Common test utilities for `xmit` integration tests.
//!
//! The reference peer is a plain loopback listener that accepts one
//! connection and reads until end-of-stream.

#![allow(dead_code)]

use std::io::Read;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// Create a temporary directory for test files.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create a test file with the given content.
pub fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Generate random bytes for testing.
pub fn random_bytes(size: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn bind_loopback() -> (TcpListener, SocketAddrV4) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("Failed to bind listener");
    let SocketAddr::V4(addr) = listener.local_addr().expect("Failed to read local addr") else {
        panic!("loopback listener is not IPv4");
    };
    (listener, addr)
}

/// Spawn a peer that collects everything sent to it.
pub fn spawn_collecting_peer() -> (SocketAddrV4, JoinHandle<Vec<u8>>) {
    let (listener, addr) = bind_loopback();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("Failed to accept");
        let mut received = Vec::new();
        stream
            .read_to_end(&mut received)
            .expect("Failed to read from sender");
        received
    });
    (addr, handle)
}

/// Spawn a peer that only counts bytes and checks that they are all zero.
///
/// Returns `(bytes_received, all_zero)`.
pub fn spawn_counting_peer() -> (SocketAddrV4, JoinHandle<(u64, bool)>) {
    let (listener, addr) = bind_loopback();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("Failed to accept");
        let mut buf = vec![0u8; 1024 * 1024];
        let mut total = 0u64;
        let mut all_zero = true;
        loop {
            let n = stream.read(&mut buf).expect("Failed to read from sender");
            if n == 0 {
                break;
            }
            all_zero &= buf[..n].iter().all(|b| *b == 0);
            total += n as u64;
        }
        (total, all_zero)
    });
    (addr, handle)
}
