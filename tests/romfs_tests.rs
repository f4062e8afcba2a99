//! Integration tests for mounting and building RomFS images.

use std::sync::Arc;
use std::thread;

use romvfs::Error;
use romvfs::fs::{EntryKind, FileSystem, OpenDirectoryMode, OpenMode, QueryId, enumerate_entries};
use romvfs::romfs::{RomFsBuilder, RomFsFileSystem, RomFsHeader, romfs_hash};
use romvfs::storage::{MemoryStorage, Storage, StorageExt};

// =============================================================================
// Helpers
// =============================================================================

fn payload() -> Vec<u8> {
    (0x10u8..0x20).collect()
}

fn push_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_i64(out: &mut Vec<u8>, v: i64) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// root -> "dir" -> "f.bin" (16 bytes), laid out by hand.
fn hand_assembled() -> Vec<u8> {
    let header = RomFsHeader {
        header_size: 0x50,
        dir_hash_table_offset: 0x210,
        dir_hash_table_size: 0x0C,
        dir_meta_table_offset: 0x21C,
        dir_meta_table_size: 0x34,
        file_hash_table_offset: 0x250,
        file_hash_table_size: 0x0C,
        file_meta_table_offset: 0x25C,
        file_meta_table_size: 0x28,
        data_offset: 0x200,
    };
    let mut out = header.to_bytes().to_vec();
    out.resize(0x200, 0);
    out.extend_from_slice(&payload());

    // Directory buckets: "" lands in 0, "dir" in 1.
    for head in [0x00, 0x18, -1] {
        push_i32(&mut out, head);
    }
    // Root: parent, sibling, child, file, next, name length.
    for v in [0, -1, 0x18, -1, -1, 0] {
        push_i32(&mut out, v);
    }
    // "dir"
    for v in [0, -1, -1, 0, -1, 3] {
        push_i32(&mut out, v);
    }
    out.extend_from_slice(b"dir\0");

    // File buckets: "f.bin" under 0x18 lands in 1.
    for head in [-1, 0, -1] {
        push_i32(&mut out, head);
    }
    push_i32(&mut out, 0x18);
    push_i32(&mut out, -1);
    push_i64(&mut out, 0);
    push_i64(&mut out, 0x10);
    push_i32(&mut out, -1);
    push_i32(&mut out, 5);
    out.extend_from_slice(b"f.bin\0\0\0");

    assert_eq!(out.len(), 0x284);
    out
}

fn sample_builder() -> RomFsBuilder<'static> {
    let mut builder = RomFsBuilder::new();
    builder
        .add_file("dir/f.bin", MemoryStorage::new(payload()))
        .unwrap();
    builder
}

fn patch_i64(image: &mut [u8], at: usize, v: i64) {
    image[at..at + 8].copy_from_slice(&v.to_le_bytes());
}

// =============================================================================
// Concrete container
// =============================================================================

#[test]
fn test_hand_assembled_image_matches_builder() {
    let built = sample_builder().build().unwrap();
    assert_eq!(built.to_vec(), hand_assembled());
}

#[test]
fn test_open_file_in_hand_assembled_image() {
    let storage = MemoryStorage::new(hand_assembled());
    let fs = RomFsFileSystem::new(&storage).unwrap();

    let file = fs.open_file("dir/f.bin", OpenMode::Read).unwrap();
    assert_eq!(file.size(), 16);
    assert_eq!(file.base_offset(), 0x200);
    assert_eq!(file.read_all().unwrap(), payload());
    assert!(matches!(
        file.read_vec(16, 1),
        Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(
        file.read_vec(8, 9),
        Err(Error::OutOfRange { .. })
    ));

    assert!(matches!(
        fs.open_file("dir/missing.bin", OpenMode::Read),
        Err(Error::PathNotFound(_))
    ));
    assert!(matches!(
        fs.open_file("dir/f.bin", OpenMode::ReadWrite),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_paths_resolve_regardless_of_spelling() {
    let storage = MemoryStorage::new(hand_assembled());
    let fs = RomFsFileSystem::new(&storage).unwrap();
    let table = fs.file_table();

    let expected = table.resolve_directory("dir").unwrap();
    for path in ["/dir", "/dir/", "dir//", "./dir", "dir/../dir"] {
        assert_eq!(table.resolve_directory(path).unwrap(), expected, "{path}");
    }
    for path in ["/dir/f.bin", "dir//f.bin", "/./dir/f.bin"] {
        assert!(fs.file_exists(path), "{path}");
    }

    let (root, _) = table.resolve_directory("").unwrap();
    let root_entry = table.directory(root).unwrap().unwrap();
    assert_eq!(root_entry.parent, root);
    assert_eq!(root_entry.name, b"");
}

#[test]
fn test_reference_hash_values() {
    assert_eq!(romfs_hash(0, b""), 0x075B_CD15);
    assert_eq!(romfs_hash(0, b"dir"), 0xCB2A_0EC6);
    assert_eq!(romfs_hash(0x18, b"f.bin"), 0xFD3C_E6EE);
}

// =============================================================================
// Builder round trips
// =============================================================================

fn tree() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("readme.txt", b"top level".to_vec()),
        ("assets/img/logo.png", vec![0x89; 300]),
        ("assets/img/icon.png", vec![0x50; 17]),
        ("assets/sound/bgm.ogg", vec![0x4F; 1024]),
        ("assets/empty.bin", vec![]),
        ("data/levels/1.dat", b"level one".to_vec()),
    ]
}

#[test]
fn test_builder_output_mounts() {
    let mut builder = RomFsBuilder::new();
    for (path, data) in tree() {
        builder.add_file(path, MemoryStorage::new(data)).unwrap();
    }
    builder.add_directory("data/saves").unwrap();
    let image = builder.build().unwrap();
    let fs = RomFsFileSystem::new(&image).unwrap();

    for (path, data) in tree() {
        let file = fs.open_file(path, OpenMode::Read).unwrap();
        assert_eq!(file.size(), data.len() as u64, "{path}");
        assert_eq!(file.read_all().unwrap(), data, "{path}");
        assert_eq!(file.base_offset() % 0x10, 0, "{path}");
    }
    assert_eq!(fs.get_entry_type("data/saves").unwrap(), EntryKind::Directory);

    let listing: Vec<_> = fs
        .open_directory("assets", OpenDirectoryMode::ALL)
        .unwrap()
        .map(|e| e.map(|e| (e.name, e.kind, e.size)))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        listing,
        vec![
            ("img".to_owned(), EntryKind::Directory, 0),
            ("sound".to_owned(), EntryKind::Directory, 0),
            ("empty.bin".to_owned(), EntryKind::File, 0),
        ]
    );
}

#[test]
fn test_enumerate_entries_walks_the_tree() {
    let mut builder = RomFsBuilder::new();
    for (path, data) in tree() {
        builder.add_file(path, MemoryStorage::new(data)).unwrap();
    }
    let image = builder.build().unwrap();
    let fs = RomFsFileSystem::new(&image).unwrap();

    let all = enumerate_entries(&fs, "/").unwrap();
    let files: Vec<_> = all
        .iter()
        .filter(|(_, e)| e.kind == EntryKind::File)
        .map(|(p, _)| p.as_str())
        .collect();
    assert_eq!(files.len(), tree().len());
    for (path, _) in tree() {
        assert!(files.contains(&format!("/{path}").as_str()), "{path}");
    }

    // Parents come before their children.
    let pos = |p: &str| all.iter().position(|(q, _)| q == p).unwrap();
    assert!(pos("/assets") < pos("/assets/img"));
    assert!(pos("/assets/img") < pos("/assets/img/logo.png"));

    let sub = enumerate_entries(&fs, "assets/img").unwrap();
    assert_eq!(sub.len(), 2);
    assert!(enumerate_entries(&fs, "nope").unwrap_err().is_not_found());
}

#[test]
fn test_rebuilding_a_mounted_image_is_byte_identical() {
    let mut builder = RomFsBuilder::new();
    for (path, data) in tree() {
        builder.add_file(path, MemoryStorage::new(data)).unwrap();
    }
    builder.add_directory("data/saves").unwrap();
    let image = builder.build().unwrap();

    let fs = RomFsFileSystem::new(&image).unwrap();
    let rebuilt = RomFsBuilder::from_file_system(&fs).unwrap().build().unwrap();
    assert_eq!(rebuilt.to_vec(), image.to_vec());
}

// =============================================================================
// Hash collisions and table growth
// =============================================================================

#[test]
fn test_colliding_file_names_are_both_found() {
    // Bytes 32 positions apart are rotated by the same amount, so swapping
    // the first and last byte of a 33-byte name keeps the hash.
    let filler = "x".repeat(31);
    let first = format!("A{filler}B");
    let second = format!("B{filler}A");

    let mut builder = RomFsBuilder::new();
    builder
        .add_file(&format!("dir/{first}"), MemoryStorage::new(vec![1; 4]))
        .unwrap();
    builder
        .add_file(&format!("dir/{second}"), MemoryStorage::new(vec![2; 8]))
        .unwrap();
    let image = builder.build().unwrap();
    let fs = RomFsFileSystem::new(&image).unwrap();

    let (dir, _) = fs.file_table().resolve_directory("dir").unwrap();
    assert_eq!(
        romfs_hash(dir.offset(), first.as_bytes()),
        romfs_hash(dir.offset(), second.as_bytes())
    );

    let a = fs.open_file(&format!("dir/{first}"), OpenMode::Read).unwrap();
    let b = fs.open_file(&format!("dir/{second}"), OpenMode::Read).unwrap();
    assert_eq!(a.read_all().unwrap(), vec![1; 4]);
    assert_eq!(b.read_all().unwrap(), vec![2; 8]);
}

#[test]
fn test_many_long_names_survive_growth() {
    let mut builder = RomFsBuilder::new();
    let names: Vec<String> = (0..200)
        .map(|i| format!("deep/{}{i:04}", "n".repeat(i % 97 + 40)))
        .collect();
    for (i, name) in names.iter().enumerate() {
        builder
            .add_file(name, MemoryStorage::new(vec![i as u8; i % 7]))
            .unwrap();
    }
    let image = builder.build().unwrap();
    let fs = RomFsFileSystem::new(&image).unwrap();

    for (i, name) in names.iter().enumerate() {
        let file = fs.open_file(name, OpenMode::Read).unwrap();
        assert_eq!(file.read_all().unwrap(), vec![i as u8; i % 7], "{name}");
    }
    let count = fs
        .open_directory("deep", OpenDirectoryMode::FILES)
        .unwrap()
        .entry_count()
        .unwrap();
    assert_eq!(count, 200);
}

// =============================================================================
// Malformed containers
// =============================================================================

fn malformed_offset(image: Vec<u8>) -> u64 {
    let storage = MemoryStorage::new(image);
    match RomFsFileSystem::new(&storage) {
        Err(Error::MalformedContainer { offset, .. }) => offset,
        other => panic!("expected a malformed container, got {:?}", other.err()),
    }
}

#[test]
fn test_truncated_container_is_rejected() {
    let mut image = hand_assembled();
    image.truncate(0x40);
    assert_eq!(malformed_offset(image), 0);
}

#[test]
fn test_bad_header_fields_are_rejected() {
    let mut image = hand_assembled();
    patch_i64(&mut image, 0x00, 0x20);
    assert_eq!(malformed_offset(image), 0x00);

    let mut image = hand_assembled();
    patch_i64(&mut image, 0x20, 0x1000);
    assert_eq!(malformed_offset(image), 0x18);

    let mut image = hand_assembled();
    patch_i64(&mut image, 0x28, 0x240);
    assert_eq!(malformed_offset(image), 0x28);

    let mut image = hand_assembled();
    patch_i64(&mut image, 0x38, -8);
    assert_eq!(malformed_offset(image), 0x38);

    let mut image = hand_assembled();
    patch_i64(&mut image, 0x48, 0x1_0000);
    assert_eq!(malformed_offset(image), 0x48);
}

#[test]
fn test_root_must_be_its_own_parent() {
    let mut image = hand_assembled();
    image[0x21C..0x220].copy_from_slice(&0x18i32.to_le_bytes());
    assert!(matches!(
        RomFsFileSystem::new(&MemoryStorage::new(image)),
        Err(Error::MalformedContainer { .. })
    ));
}

#[test]
fn test_corrupt_bucket_is_reported_not_panicking() {
    let mut image = hand_assembled();
    // File bucket 1 now points far outside the entry table.
    image[0x254..0x258].copy_from_slice(&0x4000i32.to_le_bytes());
    let storage = MemoryStorage::new(image);
    let fs = RomFsFileSystem::new(&storage).unwrap();

    assert!(matches!(
        fs.open_file("dir/f.bin", OpenMode::Read),
        Err(Error::MalformedContainer { .. })
    ));
    assert!(!fs.file_exists("dir/f.bin"));
    // Listings follow sibling links and do not touch the hash index.
    let names: Vec<_> = fs
        .open_directory("dir", OpenDirectoryMode::FILES)
        .unwrap()
        .map(|e| e.unwrap().name)
        .collect();
    assert_eq!(names, ["f.bin"]);
}

// =============================================================================
// Sharing
// =============================================================================

#[test]
fn test_concurrent_readers_see_consistent_data() {
    let mut builder = RomFsBuilder::new();
    for i in 0..16u8 {
        builder
            .add_file(&format!("files/{i}.bin"), MemoryStorage::new(vec![i; 64 + i as usize]))
            .unwrap();
    }
    let storage = Arc::new(builder.build().unwrap());
    let fs = RomFsFileSystem::new(Arc::clone(&storage)).unwrap();

    thread::scope(|s| {
        for t in 0..8u8 {
            let fs = &fs;
            s.spawn(move || {
                for round in 0..50u8 {
                    let i = (t + round) % 16;
                    let file = fs
                        .open_file(&format!("files/{i}.bin"), OpenMode::Read)
                        .unwrap();
                    assert_eq!(file.read_all().unwrap(), vec![i; 64 + i as usize]);
                    assert!(fs.directory_exists("files"));
                }
            });
        }
    });
}

#[test]
fn test_mutating_operations_are_unsupported() {
    let image = sample_builder().build().unwrap();
    let mut fs = RomFsFileSystem::new(&image).unwrap();
    assert!(matches!(
        fs.create_file("dir/new.bin", 4),
        Err(Error::UnsupportedOperation(_))
    ));
    assert!(matches!(
        fs.rename_file("dir/f.bin", "dir/g.bin"),
        Err(Error::UnsupportedOperation(_))
    ));
    assert!(matches!(
        fs.get_file_time_stamp_raw("dir/f.bin"),
        Err(Error::UnsupportedOperation(_))
    ));
    let mut out = [0u8; 4];
    assert!(matches!(
        fs.query_entry(&mut out, &[], QueryId::QueryUnpreparedFileInformation, "dir/f.bin"),
        Err(Error::UnsupportedOperation(_))
    ));
    fs.commit().unwrap();
    assert!(fs.file_exists("dir/f.bin"));
    assert!(!fs.file_exists("dir/g.bin"));
}
