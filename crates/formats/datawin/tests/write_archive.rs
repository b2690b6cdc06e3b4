mod common;

use std::fs;
use std::io::Cursor;

use common::{ogg, png, sample_archive, wav, ArchiveBuilder};
use datawin::{
    patch_archive, patch_archive_to, plan, read_index, write_archive, ArchiveIndex, AssetType, ChunkKind, Error,
    PatchRequest, PatchSource, StagedArchive,
};
use pretty_assertions::assert_eq;

fn index_of(bytes: &[u8]) -> ArchiveIndex {
    read_index(&mut Cursor::new(bytes)).unwrap()
}

fn rewrite(bytes: &[u8], requests: &[PatchRequest]) -> datawin::Result<Vec<u8>> {
    let index = index_of(bytes);
    let patched = plan(&index, requests)?;
    let mut out = Cursor::new(Vec::new());
    write_archive(&mut Cursor::new(bytes), &patched, &mut out)?;
    Ok(out.into_inner())
}

fn entry(bytes: &[u8], kind: ChunkKind, i: usize) -> Vec<u8> {
    index_of(bytes).read_entry(&mut Cursor::new(bytes), kind, i).unwrap()
}

#[test]
fn empty_plan_reproduces_archive() {
    let bytes = sample_archive();
    assert_eq!(rewrite(&bytes, &[]).unwrap(), bytes);
}

#[test]
fn growing_texture_moves_everything_after_it() {
    let bytes = sample_archive();
    let replacement = png(64, 32, 400);
    let delta = replacement.len() as i64 - 157;
    let requests = [PatchRequest::texture_from_bytes(0, replacement.clone()).unwrap()];

    let out = rewrite(&bytes, &requests).unwrap();
    assert_eq!(out.len() as i64, bytes.len() as i64 + delta);
    assert_eq!(&out[4..8], &((bytes.len() as i64 + delta - 8) as u32).to_le_bytes());

    let before = index_of(&bytes);
    let after = index_of(&out);
    assert_eq!(entry(&out, ChunkKind::Textures, 0), replacement);
    assert_eq!(entry(&out, ChunkKind::Textures, 1), png(16, 16, 10));
    for i in 0..3 {
        assert_eq!(entry(&out, ChunkKind::Audio, i), entry(&bytes, ChunkKind::Audio, i));
    }

    let audo_before = before.find(ChunkKind::Audio).unwrap();
    let audo_after = after.find(ChunkKind::Audio).unwrap();
    assert_eq!(i64::from(audo_after.header_offset), i64::from(audo_before.header_offset) + delta);

    // Chunks ahead of the patch are untouched, byte for byte.
    let txtr = before.find(ChunkKind::Textures).unwrap();
    let head = txtr.header_offset as usize;
    assert_eq!(&out[8..head], &bytes[8..head]);
}

#[test]
fn reindexing_output_matches_plan() {
    let bytes = sample_archive();
    let index = index_of(&bytes);
    let requests = [
        PatchRequest::texture_from_bytes(1, png(16, 16, 2)).unwrap(),
        PatchRequest::audio_from_bytes(1, ogg(300)).unwrap(),
    ];
    let patched = plan(&index, &requests).unwrap();
    let mut out = Cursor::new(Vec::new());
    write_archive(&mut Cursor::new(&bytes), &patched, &mut out).unwrap();
    let reread = index_of(&out.into_inner());

    assert_eq!(reread.len(), patched.chunks().len());
    for (got, want) in reread.chunks().iter().zip(patched.chunks()) {
        assert_eq!(got.kind, want.kind);
        assert_eq!(got.header_offset, want.header_offset);
        assert_eq!(got.payload_size, want.payload_size);
        let got_entries: Vec<(u32, u32)> = got.entries.iter().map(|e| (e.offset, e.size)).collect();
        let want_entries: Vec<(u32, u32)> = want.entries.iter().map(|e| (e.offset, e.size)).collect();
        assert_eq!(got_entries, want_entries);
    }
    assert_eq!(reread.form_size(), patched.form_size());
}

#[test]
fn request_order_does_not_change_output() {
    let bytes = sample_archive();
    let a = PatchRequest::texture_from_bytes(0, png(64, 32, 20)).unwrap();
    let b = PatchRequest::audio_from_bytes(0, wav(100)).unwrap();
    let c = PatchRequest::audio_from_bytes(2, b"still not audio, but longer".to_vec()).unwrap();

    let forward = rewrite(&bytes, &[a.clone(), b.clone(), c.clone()]).unwrap();
    let backward = rewrite(&bytes, &[c, b, a]).unwrap();
    assert_eq!(forward, backward);
}

#[test]
fn texture_chunk_after_patched_audio_is_rebased() {
    let pages = [png(64, 32, 100), png(16, 16, 10)];
    let bytes = ArchiveBuilder::new()
        .audio(&[wav(40), ogg(30)])
        .textures(&pages)
        .build();
    let requests = [PatchRequest::audio_from_bytes(0, wav(200)).unwrap()];
    let out = rewrite(&bytes, &requests).unwrap();
    assert_eq!(out.len(), bytes.len() + 160);

    let before = index_of(&bytes);
    let after = index_of(&out);
    let txtr_before = before.find(ChunkKind::Textures).unwrap();
    let txtr_after = after.find(ChunkKind::Textures).unwrap();
    assert_eq!(txtr_after.header_offset, txtr_before.header_offset + 160);
    assert_eq!(txtr_after.payload_size, txtr_before.payload_size);

    let moved: Vec<u32> = txtr_before.entries.iter().map(|e| e.offset + 160).collect();
    let found: Vec<u32> = txtr_after.entries.iter().map(|e| e.offset).collect();
    assert_eq!(found, moved);
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(&entry(&out, ChunkKind::Textures, i), page);
        assert_eq!(txtr_after.entries[i].dimensions, txtr_before.entries[i].dimensions);
    }
    assert_eq!(entry(&out, ChunkKind::Audio, 0), wav(200));
    assert_eq!(entry(&out, ChunkKind::Audio, 1), ogg(30));
}

#[test]
fn shrinking_last_audio_entry() {
    let bytes = sample_archive();
    let out = rewrite(&bytes, &[PatchRequest::audio_from_bytes(2, b"tiny".to_vec()).unwrap()]).unwrap();
    assert_eq!(out.len(), bytes.len() - 10);
    assert_eq!(entry(&out, ChunkKind::Audio, 2), b"tiny");
    assert_eq!(entry(&out, ChunkKind::Audio, 1), ogg(30));
}

#[test]
fn texture_dimensions_must_match() {
    let bytes = sample_archive();
    let requests = [PatchRequest::texture_from_bytes(1, png(32, 16, 10)).unwrap()];
    let err = rewrite(&bytes, &requests).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { index: 1, .. }), "{err}");
}

#[test]
fn opaque_chunk_after_patch_is_rejected() {
    let bytes = ArchiveBuilder::new()
        .textures(&[png(4, 4, 4)])
        .opaque(ChunkKind::Strings, &[0; 8])
        .build();
    let requests = [PatchRequest::texture_from_bytes(0, png(4, 4, 40)).unwrap()];
    assert!(matches!(
        rewrite(&bytes, &requests),
        Err(Error::UnsupportedOperation { chunk: ChunkKind::Strings, .. })
    ));
}

#[test]
fn short_memory_payload_fails_write() {
    let bytes = sample_archive();
    let request = PatchRequest::new(ChunkKind::Audio, 0, AssetType::Wave, PatchSource::Memory(wav(20)), 40);
    assert!(matches!(rewrite(&bytes, &[request]), Err(Error::Io { .. })));
}

#[test]
fn patches_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.win");
    fs::write(&path, sample_archive()).unwrap();

    patch_archive(&path, &[PatchRequest::audio_from_bytes(0, wav(64)).unwrap()]).unwrap();

    let out = fs::read(&path).unwrap();
    assert_eq!(entry(&out, ChunkKind::Audio, 0), wav(64));
    assert!(!StagedArchive::temp_path_for(&path).exists());
}

#[test]
fn rejected_patch_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.win");
    let original = sample_archive();
    fs::write(&path, &original).unwrap();

    // Entry 1 is Ogg; a wave replacement is refused.
    let err = patch_archive(&path, &[PatchRequest::audio_from_bytes(1, wav(64)).unwrap()]).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { index: 1, .. }), "{err}");
    assert_eq!(fs::read(&path).unwrap(), original);
    assert!(!StagedArchive::temp_path_for(&path).exists());
}

#[test]
fn failed_write_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.win");
    let original = sample_archive();
    fs::write(&path, &original).unwrap();

    let missing = dir.path().join("gone.wav");
    let request = PatchRequest::new(ChunkKind::Audio, 0, AssetType::Wave, PatchSource::File(missing), 40);
    assert!(matches!(patch_archive(&path, &[request]), Err(Error::Io { .. })));
    assert_eq!(fs::read(&path).unwrap(), original);
    assert!(!StagedArchive::temp_path_for(&path).exists());
}

#[test]
fn file_payloads_are_streamed_to_new_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("data.win");
    let output = dir.path().join("patched.win");
    let original = sample_archive();
    fs::write(&input, &original).unwrap();

    let page = dir.path().join("page.png");
    let mut page_bytes = png(64, 32, 250);
    let page_len = page_bytes.len();
    // Trailing bytes past IEND are not part of the image.
    page_bytes.extend_from_slice(b"trailer");
    fs::write(&page, &page_bytes).unwrap();
    let clip = dir.path().join("clip.ogg");
    fs::write(&clip, ogg(77)).unwrap();

    let requests = [
        PatchRequest::texture_from_file(0, &page).unwrap(),
        PatchRequest::audio_from_file(1, &clip).unwrap(),
    ];
    assert_eq!(requests[0].size as usize, page_len);
    assert_eq!(requests[1].asset_type, AssetType::Ogg);
    patch_archive_to(&input, &output, &requests).unwrap();

    assert_eq!(fs::read(&input).unwrap(), original);
    let out = fs::read(&output).unwrap();
    assert_eq!(entry(&out, ChunkKind::Textures, 0), &page_bytes[..page_len]);
    assert_eq!(entry(&out, ChunkKind::Audio, 1), ogg(77));
}
