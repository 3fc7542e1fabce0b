//! Geolocation and capture-time embedding for merged outputs.
//!
//! Images get EXIF GPS reference/rational tags plus the three date-time
//! slots, written with `little_exif` and spliced into the JPEG's APP1
//! segment via `img-parts`. Videos get a metadata-only FFmpeg remux that
//! copies every stream and sets the container `location` (ISO 6709) and
//! `creation_time` fields, staged through a temp sibling and atomically
//! renamed so the original is never left half-written.
//!
//! Embedding is best effort by contract: callers log failures and keep the
//! metadata-less output.

use std::path::Path;

use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use little_exif::endian::Endian;
use little_exif::exif_tag::ExifTag;
use little_exif::ifd::ExifTagGroup;
use little_exif::exif_tag_format::ExifTagFormat;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use tracing::{debug, info};

use snapkeep_models::geo::{DmsRational, GeoPoint};
use snapkeep_models::timestamp::CaptureTime;

use crate::command::{Ffmpeg, FfmpegCommand};
use crate::error::{MediaError, MediaResult};

// GPS IFD tag IDs (not covered by little_exif's named variants).
const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
const TAG_GPS_LATITUDE: u16 = 0x0002;
const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
const TAG_GPS_LONGITUDE: u16 = 0x0004;

// little_exif's as_u8_vec(JPEG) output is [APP1 marker 2B][length 2B]
// ["Exif\0\0" 6B][TIFF data]; img-parts set_exif() wants only the TIFF data.
const JPEG_EXIF_OVERHEAD: usize = 10;

/// Encode three EXIF rationals (deg/1, min/1, sec_num/sec_den) little-endian.
fn encode_gps_rational(dms: DmsRational) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(24);
    bytes.extend_from_slice(&dms.degrees.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&dms.minutes.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&dms.seconds_num.to_le_bytes());
    bytes.extend_from_slice(&DmsRational::SECONDS_DENOMINATOR.to_le_bytes());
    bytes
}

fn gps_string_tag(tag_id: u16, value: &str) -> MediaResult<ExifTag> {
    ExifTag::from_u16_with_data(
        tag_id,
        &ExifTagFormat::STRING,
        &format!("{value}\0").into_bytes(),
        &Endian::Little,
        &ExifTagGroup::GPS,
    )
    .map_err(|e| MediaError::exif_write(format!("GPS tag 0x{tag_id:04x}: {e}")))
}

fn gps_rational_tag(tag_id: u16, dms: DmsRational) -> MediaResult<ExifTag> {
    ExifTag::from_u16_with_data(
        tag_id,
        &ExifTagFormat::RATIONAL64U,
        &encode_gps_rational(dms),
        &Endian::Little,
        &ExifTagGroup::GPS,
    )
    .map_err(|e| MediaError::exif_write(format!("GPS tag 0x{tag_id:04x}: {e}")))
}

/// Build the full tag set for one embed: four GPS tags, plus the three
/// date-time slots when a capture time is known.
fn build_tags(geo: &GeoPoint, time: Option<&CaptureTime>) -> MediaResult<Vec<ExifTag>> {
    let mut tags = vec![
        gps_string_tag(TAG_GPS_LATITUDE_REF, geo.latitude_ref())?,
        gps_rational_tag(TAG_GPS_LATITUDE, geo.latitude_dms())?,
        gps_string_tag(TAG_GPS_LONGITUDE_REF, geo.longitude_ref())?,
        gps_rational_tag(TAG_GPS_LONGITUDE, geo.longitude_dms())?,
    ];

    if let Some(time) = time {
        let formatted = time.exif_datetime();
        tags.push(ExifTag::ModifyDate(formatted.clone()));
        tags.push(ExifTag::DateTimeOriginal(formatted.clone()));
        tags.push(ExifTag::CreateDate(formatted));
    }

    Ok(tags)
}

/// Write GPS (and optional capture time) EXIF into a merged JPEG.
///
/// The merged file is freshly encoded by the image compositor and carries no
/// EXIF yet, so the APP1 segment is built from scratch and inserted.
pub fn embed_image_gps(
    path: &Path,
    geo: &GeoPoint,
    time: Option<&CaptureTime>,
) -> MediaResult<()> {
    let tags = build_tags(geo, time)?;

    let mut metadata = Metadata::new();
    for tag in tags {
        metadata.set_tag(tag);
    }

    let exif_bytes = metadata.as_u8_vec(FileExtension::JPEG)?;
    if exif_bytes.len() <= JPEG_EXIF_OVERHEAD {
        return Err(MediaError::exif_write("empty EXIF payload"));
    }
    let tiff_data = exif_bytes[JPEG_EXIF_OVERHEAD..].to_vec();

    let file_bytes = std::fs::read(path)?;
    let mut jpeg = Jpeg::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| MediaError::exif_write(format!("not a parsable JPEG: {e}")))?;
    jpeg.set_exif(Some(Bytes::from(tiff_data)));
    std::fs::write(path, jpeg.encoder().bytes())?;

    info!(
        path = %path.display(),
        lat = geo.latitude,
        lon = geo.longitude,
        has_time = time.is_some(),
        "Embedded GPS EXIF"
    );
    Ok(())
}

/// Write GPS (and optional capture time) container metadata into a merged
/// video via a stream-copy remux.
///
/// Writes to a temp sibling then renames over the original; on any failure
/// the temp file is removed and the original is untouched.
pub async fn embed_video_gps(
    ffmpeg: &Ffmpeg,
    path: &Path,
    geo: &GeoPoint,
    time: Option<&CaptureTime>,
) -> MediaResult<()> {
    let temp = path.with_extension("tmp.mp4");

    let mut cmd = FfmpegCommand::new(&temp)
        .input(path)
        .copy_streams()
        .metadata("location", geo.to_iso6709());
    if let Some(time) = time {
        cmd = cmd.metadata("creation_time", time.creation_time());
    }

    debug!(
        path = %path.display(),
        location = %geo.to_iso6709(),
        "Remuxing with container metadata"
    );

    if let Err(e) = ffmpeg.run(&cmd).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e);
    }

    tokio::fs::rename(&temp, path).await?;

    info!(
        path = %path.display(),
        lat = geo.latitude,
        lon = geo.longitude,
        has_time = time.is_some(),
        "Embedded GPS container metadata"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn jpeg_fixture(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("merged.jpg");
        RgbImage::from_pixel(6, 6, Rgb([120, 130, 140]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn gps_rational_layout() {
        let dms = DmsRational {
            degrees: 40,
            minutes: 42,
            seconds_num: 4608, // 46.08s
        };
        let bytes = encode_gps_rational(dms);
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[0..4], &40u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &4608u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &100u32.to_le_bytes());
    }

    #[test]
    fn embeds_exif_segment_into_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = jpeg_fixture(dir.path());
        let geo = GeoPoint::new(40.7128, -74.006);
        let time = CaptureTime::parse("2021-10-06 23:09:21 UTC").unwrap();

        embed_image_gps(&path, &geo, Some(&time)).unwrap();

        // The file must still decode, and now carry an EXIF segment.
        image::open(&path).unwrap();
        let jpeg = Jpeg::from_bytes(Bytes::from(std::fs::read(&path).unwrap())).unwrap();
        let exif = jpeg.exif().expect("EXIF segment present");
        assert!(!exif.is_empty());
    }

    #[test]
    fn embed_without_time_still_writes_gps() {
        let dir = TempDir::new().unwrap();
        let path = jpeg_fixture(dir.path());

        embed_image_gps(&path, &GeoPoint::new(-33.8688, 151.2093), None).unwrap();

        let jpeg = Jpeg::from_bytes(Bytes::from(std::fs::read(&path).unwrap())).unwrap();
        assert!(jpeg.exif().is_some());
    }

    #[test]
    fn non_jpeg_input_fails_without_touching_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merged.jpg");
        std::fs::write(&path, b"not actually a jpeg").unwrap();
        let before = std::fs::read(&path).unwrap();

        let result = embed_image_gps(&path, &GeoPoint::new(1.0, 2.0), None);
        assert!(result.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }
}
