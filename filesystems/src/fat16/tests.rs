// End-to-end scenarios across the FAT16 modules

use super::*;
use crate::fat_common::FatAttributes;
use crate::test_helpers::{raw_entry, FixtureGeometry, ImageBuilder};
use std::io::SeekFrom;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn read_all(file: &mut FileHandle<'_>, chunk: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; chunk];
    loop {
        let n = file.read(&mut buf).unwrap();
        if n == 0 {
            return out;
        }
        out.extend_from_slice(&buf[..n]);
    }
}

#[test]
fn test_nested_file_resolution_and_read() {
    init_logging();
    let data = pattern(1500, 7);
    let mut builder = ImageBuilder::new();
    let dir = builder.add_directory(None, b"DIR     ", 1);
    builder.add_file(Some(dir), b"FILE    ", b"TXT", &data);

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();

    let entry = volume.resolve("\\DIR\\FILE.TXT").unwrap();
    assert_eq!(entry.short_name(), "FILE.TXT");
    assert_eq!(entry.size, 1500);

    let mut file = volume.open_file("\\dir\\file.txt").unwrap();
    assert_eq!(read_all(&mut file, 4096), data);
}

#[test]
fn test_chunked_reads_match_single_read_and_reopen() {
    let data = pattern(5000, 3);
    let mut builder = ImageBuilder::with_geometry(FixtureGeometry {
        sectors_per_cluster: 2,
        ..FixtureGeometry::default()
    });
    // Deliberately fragmented and out of order
    builder.reserve(&[2, 3, 4]);
    builder.add_file_at(None, b"FRAG    ", b"BIN", &data, &[9, 5, 12, 6, 20]);

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();

    let mut whole = volume.open_file("\\FRAG.BIN").unwrap();
    assert_eq!(whole.cluster_chain().clusters().collect::<Vec<_>>(), vec![9, 5, 12, 6, 20]);
    let single = read_all(&mut whole, 8192);

    let mut chunked = volume.open_file("\\FRAG.BIN").unwrap();
    let pieces = read_all(&mut chunked, 97);

    let mut reopened = volume.open_file("\\FRAG.BIN").unwrap();
    let again = read_all(&mut reopened, 1024);

    assert_eq!(single, data);
    assert_eq!(pieces, data);
    assert_eq!(again, data);
}

#[test]
fn test_seek_then_read_at_size_returns_zero() {
    let data = pattern(600, 1);
    let mut builder = ImageBuilder::new();
    builder.add_file(None, b"EDGE    ", b"DAT", &data);

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();
    let mut file = volume.open_file("\\EDGE.DAT").unwrap();

    assert!(file.seek(SeekFrom::Start(601)).is_err());
    assert!(file.seek(SeekFrom::End(1)).is_err());
    assert_eq!(file.position(), 0);

    assert_eq!(file.seek(SeekFrom::Start(600)).unwrap(), 600);
    let mut buf = [0u8; 16];
    assert_eq!(file.read(&mut buf).unwrap(), 0);

    // Seeking back into the data resumes mid-cluster
    assert_eq!(file.seek(SeekFrom::Current(-90)).unwrap(), 510);
    assert_eq!(file.read(&mut buf).unwrap(), 16);
    assert_eq!(&buf[..], &data[510..526]);
}

#[test]
fn test_file_component_cannot_have_children() {
    let mut builder = ImageBuilder::new();
    builder.add_file(None, b"FILE    ", b"TXT", b"contents");

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();

    let err = volume.resolve("\\FILE.TXT\\X").unwrap_err();
    assert_eq!(err.kind_name(), "NotFound");
    let err = volume.open_file("\\FILE.TXT\\X").err().unwrap();
    assert_eq!(err.kind_name(), "NotFound");
}

#[test]
fn test_root_listing_skips_deleted_and_long_name_slots() {
    let mut builder = ImageBuilder::new();
    builder.add_file(None, b"FIRST   ", b"TXT", b"1");

    let mut deleted = raw_entry(b"GONE    ", b"TXT", FatAttributes::ARCHIVE, 0, 0);
    deleted[0] = 0xE5;
    builder.push_entry(None, deleted);
    builder.push_entry(None, raw_entry(b"Ab\0c\0d\0e", b"\0f\0", FatAttributes::LFN, 0, 0));
    builder.add_file(None, b"SECOND  ", b"TXT", b"2");
    // Slot 4 is the end marker; anything after it is never listed
    builder.set_slot(None, 6, raw_entry(b"AFTER   ", b"TXT", FatAttributes::ARCHIVE, 0, 1));

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();

    let listed: Vec<String> = volume.open_dir("\\").unwrap().map(|v| v.name).collect();
    assert_eq!(listed, vec!["FIRST.TXT", "SECOND.TXT"]);
    assert!(volume.resolve("\\AFTER.TXT").is_err());
}

#[test]
fn test_escaped_e5_name_is_listed() {
    let mut builder = ImageBuilder::new();
    let escaped = raw_entry(b"\x05ABC    ", b"TXT", FatAttributes::ARCHIVE, 0, 0);
    builder.push_entry(None, escaped);

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();

    let mut handle = volume.open_dir("\\").unwrap();
    assert_eq!(handle.read().unwrap().name, "\u{E5}ABC.TXT");
}

#[test]
fn test_deep_tree_walk() {
    let mut builder = ImageBuilder::new();
    let a = builder.add_directory(None, b"A       ", 1);
    let b = builder.add_directory(Some(a), b"B       ", 1);
    let c = builder.add_directory(Some(b), b"C       ", 1);
    let data = pattern(40, 9);
    builder.add_file(Some(c), b"LEAF    ", b"BIN", &data);

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();

    let mut file = volume.open_file("\\A\\B\\C\\LEAF.BIN").unwrap();
    assert_eq!(read_all(&mut file, 8), data);

    // ".." of a nested directory is an ordinary directory entry
    let entry = volume.resolve("\\A\\B\\C\\..").unwrap();
    assert_eq!(entry.first_cluster, b);

    let listed: Vec<String> = volume.open_dir("\\A\\B\\..\\B\\C").unwrap().map(|v| v.name).collect();
    assert_eq!(listed, vec![".", "..", "LEAF.BIN"]);
}

#[test]
fn test_handles_coexist_on_one_volume() {
    let mut builder = ImageBuilder::new();
    let one = pattern(700, 1);
    let two = pattern(900, 2);
    builder.add_file(None, b"ONE     ", b"BIN", &one);
    builder.add_file(None, b"TWO     ", b"BIN", &two);

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();

    let mut first = volume.open_file("\\ONE.BIN").unwrap();
    let mut second = volume.open_file("\\TWO.BIN").unwrap();
    let root = volume.open_dir("\\").unwrap();

    let mut a = [0u8; 300];
    let mut b = [0u8; 300];
    first.read(&mut a).unwrap();
    second.read(&mut b).unwrap();
    assert_eq!(&a[..], &one[..300]);
    assert_eq!(&b[..], &two[..300]);
    assert_eq!(root.len(), 2);

    first.read(&mut a).unwrap();
    assert_eq!(&a[..], &one[300..600]);

    first.close();
    second.close();
    root.close();
    volume.close().unwrap();
}

#[test]
fn test_volume_behind_hidden_sectors() {
    // The boot record is read at the requested sector while the table and
    // root directory are located from the reserved count alone.
    let data = pattern(100, 4);
    let mut builder = ImageBuilder::with_geometry(FixtureGeometry {
        hidden_sectors: 2,
        ..FixtureGeometry::default()
    });
    builder.add_file(None, b"HID     ", b"DAT", &data);

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();
    let mut file = volume.open_file("\\HID.DAT").unwrap();
    assert_eq!(read_all(&mut file, 64), data);
}

#[test]
fn test_reopen_yields_identical_structures() {
    let mut builder = ImageBuilder::new();
    let dir = builder.add_directory(None, b"SUB     ", 1);
    builder.add_file(Some(dir), b"INNER   ", b"TXT", &pattern(1200, 5));
    builder.add_file(None, b"OUTER   ", b"TXT", &pattern(300, 6));

    let device = builder.device().unwrap();

    let first = Volume::open(&device, 0).unwrap();
    let root_before = first.root_entries().to_vec();
    let chain_before = first.open_file("\\SUB\\INNER.TXT").unwrap().cluster_chain().clone();
    let listing_before: Vec<_> = first.open_dir("\\SUB").unwrap().collect();
    first.close().unwrap();

    let second = Volume::open(&device, 0).unwrap();
    assert_eq!(second.root_entries(), &root_before[..]);
    assert_eq!(second.open_file("\\SUB\\INNER.TXT").unwrap().cluster_chain(), &chain_before);
    let listing_after: Vec<_> = second.open_dir("\\SUB").unwrap().collect();
    assert_eq!(listing_after, listing_before);
}

#[test]
fn test_free_link_mid_chain_never_reads_another_files_cluster() {
    init_logging();
    let mut builder = ImageBuilder::new();
    let other = builder.add_file(None, b"OTHER   ", b"BIN", &[0xAA; 512]);
    assert_eq!(other, 2);

    let clusters = builder.allocate(1);
    builder.write_clusters(&clusters, &[0x11; 512]);
    // Declares two clusters' worth, but the table link after the first is free
    builder.push_entry(None, raw_entry(b"BROKEN  ", b"BIN", FatAttributes::ARCHIVE, clusters[0], 1024));
    builder.set_fat_entry(clusters[0], 0x0000);

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();
    let mut file = volume.open_file("\\BROKEN.BIN").unwrap();
    assert_eq!(file.cluster_chain().clusters().collect::<Vec<_>>(), clusters);

    let mut out = vec![0u8; 1024];
    assert_eq!(file.read(&mut out).unwrap(), 512);
    assert!(out[..512].iter().all(|&b| b == 0x11));
    assert!(!out.contains(&0xAA));
}

#[test]
fn test_end_marker_in_first_cluster_stops_whole_directory() {
    let mut builder = ImageBuilder::new();
    let dir = builder.add_directory(None, b"SUB     ", 2);
    builder.push_entry(Some(dir), raw_entry(b"KEEP    ", b"TXT", FatAttributes::ARCHIVE, 0, 3));
    // Slot 3 is the end marker; slot 16 opens the second cluster with a leftover
    builder.set_slot(Some(dir), 16, raw_entry(b"STALE   ", b"TXT", FatAttributes::ARCHIVE, 0, 3));

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();

    let listed: Vec<String> = volume.open_dir("\\SUB").unwrap().map(|v| v.name).collect();
    assert_eq!(listed, vec![".", "..", "KEEP.TXT"]);

    assert_eq!(volume.resolve("\\SUB\\KEEP.TXT").unwrap().size, 3);
    let err = volume.resolve("\\SUB\\STALE.TXT").unwrap_err();
    assert_eq!(err.kind_name(), "NotFound");
}

#[test]
fn test_empty_file_in_subdirectory_is_not_the_root() {
    let mut builder = ImageBuilder::new();
    let dir = builder.add_directory(None, b"SUB     ", 1);
    assert_eq!(builder.add_file(Some(dir), b"EMPTY   ", b"TXT", b""), 0);

    let device = builder.device().unwrap();
    let volume = Volume::open(&device, 0).unwrap();

    // Only directories with cluster 0 lead back to the root
    let entry = volume.resolve("\\SUB\\EMPTY.TXT").unwrap();
    assert_eq!(entry.short_name(), "EMPTY.TXT");
    assert_eq!(entry.first_cluster, 0);

    let mut file = volume.open_file("\\SUB\\EMPTY.TXT").unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(file.read(&mut buf).unwrap(), 0);

    let err = volume.resolve("\\SUB\\EMPTY.TXT\\X").unwrap_err();
    assert_eq!(err.kind_name(), "NotFound");
    let err = volume.open_dir("\\SUB\\EMPTY.TXT").err().unwrap();
    assert_eq!(err.kind_name(), "NotADirectory");
}

#[test]
fn test_boot_record_at_nonzero_first_sector() {
    let data = pattern(700, 8);
    let mut builder = ImageBuilder::with_geometry(FixtureGeometry {
        reserved_sectors: 4,
        ..FixtureGeometry::default()
    });
    builder.add_file(None, b"PART    ", b"DAT", &data);

    // Copy the boot record into reserved sector 2 and spoil the one at 0
    let mut image = builder.build();
    let boot: Vec<u8> = image[..512].to_vec();
    image[2 * 512..3 * 512].copy_from_slice(&boot);
    image[0x1FE] = 0x00;
    let device = crate::device_reader::BlockDevice::from_source(std::io::Cursor::new(image)).unwrap();

    let err = Volume::open(&device, 0).err().unwrap();
    assert_eq!(err.kind_name(), "InvalidFormat");

    // Table and root stay at their absolute positions
    let volume = Volume::open(&device, 2).unwrap();
    assert_eq!(volume.root_dir_start(), 4 + 2);
    assert_eq!(volume.first_data_sector(), 4 + 2 + 1);

    let mut file = volume.open_file("\\PART.DAT").unwrap();
    assert_eq!(read_all(&mut file, 256), data);
}
