//! Large-file reads and writes through bounded and unbounded views.

use mmap_view::{AccessMode, MappedFileView, OpenMode};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BIG_FILE_SIZE: usize = 1024 * 1024 * 100;
const CHUNK: usize = BIG_FILE_SIZE / 10;

fn big_data() -> Vec<u8> {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    let mut data = Vec::with_capacity(BIG_FILE_SIZE);
    for i in 0..10 {
        data.extend(std::iter::repeat(ALPHABET[(i * 7) % ALPHABET.len()]).take(CHUNK));
    }
    data
}

fn big_file(dir: &TempDir, data: &[u8]) -> PathBuf {
    let path = dir.path().join("big.txt");
    fs::write(&path, data).expect("write big file");
    path
}

fn open(path: &Path, access: AccessMode, mapping_size: u64) -> MappedFileView {
    MappedFileView::from_existing_file(path, access, OpenMode::OpenExisting, mapping_size, 0)
        .expect("open big file")
}

#[test]
fn read_big_file_in_blocks() {
    let dir = TempDir::new().expect("tempdir");
    let data = big_data();
    let path = big_file(&dir, &data);

    let mut view = open(&path, AccessMode::ReadWrite, CHUNK as u64);
    for i in 0..10 {
        let block = view.read(CHUNK, true).expect("read block");
        assert!(block == data[i * CHUNK..(i + 1) * CHUNK], "block {i} differs");
    }
    assert!(view.read(CHUNK, true).expect("read at eof").is_empty());
}

#[test]
fn read_big_file_in_one_go() {
    let dir = TempDir::new().expect("tempdir");
    let data = big_data();
    let path = big_file(&dir, &data);

    let mut view = open(&path, AccessMode::ReadOnly, 0);
    let all = view.read(BIG_FILE_SIZE, true).expect("read all");
    assert!(all == data);
}

#[test]
fn read_big_file_of_unknown_size() {
    const FIVE_MB: usize = 1024 * 1024 * 5;
    let dir = TempDir::new().expect("tempdir");
    let data = big_data();
    let path = big_file(&dir, &data);

    let mut view = open(&path, AccessMode::ReadOnly, 0);
    let mut counter = 0;
    loop {
        let block = view.read(FIVE_MB, true).expect("read");
        if block.is_empty() {
            break;
        }
        assert!(block == data[counter * FIVE_MB..(counter + 1) * FIVE_MB]);
        counter += 1;
    }
    assert_eq!(counter, BIG_FILE_SIZE / FIVE_MB);
}

#[cfg(feature = "iterator")]
#[test]
fn chunks_reconstruct_big_file() {
    let dir = TempDir::new().expect("tempdir");
    let data = big_data();
    let path = big_file(&dir, &data);

    let mut view = open(&path, AccessMode::ReadOnly, CHUNK as u64);
    let mut rebuilt = Vec::with_capacity(BIG_FILE_SIZE);
    for chunk in view.chunks(CHUNK) {
        rebuilt.extend_from_slice(&chunk.expect("chunk"));
    }
    assert!(rebuilt == data);
}

#[test]
fn write_big_amount_of_data_in_chunks() {
    let dir = TempDir::new().expect("tempdir");
    let data = big_data();
    let path = dir.path().join("new_big.txt");

    {
        let mut view = MappedFileView::for_new_file(&path, BIG_FILE_SIZE as u64).expect("create");
        for i in 0..2 {
            let half = BIG_FILE_SIZE / 2;
            assert!(view
                .write(&data[i * half..(i + 1) * half], (i * half) as u64, true, true)
                .expect("write half"));
        }
    }
    assert!(fs::read(&path).expect("read back") == data);
}

#[test]
fn write_big_amount_of_data() {
    let dir = TempDir::new().expect("tempdir");
    let data = big_data();
    let path = dir.path().join("new_big.txt");

    {
        let mut view = MappedFileView::for_new_file(&path, BIG_FILE_SIZE as u64).expect("create");
        assert!(view.write(&data, 0, true, true).expect("write"));
    }
    assert!(fs::read(&path).expect("read back") == data);
}
