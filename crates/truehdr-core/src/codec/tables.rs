//! Frozen encoder argument tables.
//!
//! Every invocation parameter except quality and the SDR/HDR color variant is
//! fixed. Changing any value here changes the output format contract, so the
//! tables are kept literal and covered by tests.

use std::path::Path;

use super::DynamicRange;

/// Color signaling parameters for heif-enc.
struct HeicColor {
    bit_depth: &'static str,
    matrix_coefficients: &'static str,
    colour_primaries: &'static str,
    transfer_characteristic: &'static str,
}

const HEIC_SDR: HeicColor = HeicColor {
    bit_depth: "8",
    matrix_coefficients: "6",
    colour_primaries: "1",
    transfer_characteristic: "13",
};

const HEIC_HDR: HeicColor = HeicColor {
    bit_depth: "10",
    matrix_coefficients: "9",
    colour_primaries: "9",
    transfer_characteristic: "13",
};

/// Color signaling parameters for avifenc.
struct AvifColor {
    depth: &'static str,
    cicp: &'static str,
}

const AVIF_SDR: AvifColor = AvifColor {
    depth: "8",
    cicp: "1/13/6",
};

const AVIF_HDR: AvifColor = AvifColor {
    depth: "10",
    cicp: "9/16/9",
};

/// PQ color space tag passed to cjxl for HDR input.
const CJXL_HDR_COLOR_SPACE: &str = "RGB_D65_202_Rel_PeQ";

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// ffmpeg PNG-to-BMP bridge for the JPEG pipeline. cjpeg cannot read PNG, so
/// the source is first flattened to 24-bit BMP.
pub fn ffmpeg_bmp_args(png: &Path, bmp: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        lossy(png),
        "-pix_fmt".into(),
        "rgb24".into(),
        lossy(bmp),
    ]
}

pub fn cjpeg_args(bmp: &Path, jpg: &Path, quality: u32) -> Vec<String> {
    vec![
        "-quality".into(),
        quality.to_string(),
        "-optimize".into(),
        "-precision".into(),
        "8".into(),
        "-outfile".into(),
        lossy(jpg),
        lossy(bmp),
    ]
}

pub fn cjxl_args(png: &Path, jxl: &Path, quality: u32, range: DynamicRange) -> Vec<String> {
    let mut args = vec![
        lossy(png),
        lossy(jxl),
        "--quality".into(),
        quality.to_string(),
        "--effort".into(),
        "7".into(),
        "--brotli_effort".into(),
        "11".into(),
        "--num_threads".into(),
        "-1".into(),
        "--gaborish".into(),
        "1".into(),
    ];
    if range == DynamicRange::Hdr {
        args.push("-x".into());
        args.push(format!("color_space={CJXL_HDR_COLOR_SPACE}"));
    }
    args
}

pub fn heif_enc_args(png: &Path, heic: &Path, quality: u32, range: DynamicRange) -> Vec<String> {
    let color = match range {
        DynamicRange::Sdr => HEIC_SDR,
        DynamicRange::Hdr => HEIC_HDR,
    };
    vec![
        "--thumb".into(),
        "off".into(),
        "--no-alpha".into(),
        "--no-thumb-alpha".into(),
        "--bit-depth".into(),
        color.bit_depth.into(),
        "--quality".into(),
        quality.to_string(),
        "--matrix_coefficients".into(),
        color.matrix_coefficients.into(),
        "--colour_primaries".into(),
        color.colour_primaries.into(),
        "--transfer_characteristic".into(),
        color.transfer_characteristic.into(),
        "--full_range_flag".into(),
        "1".into(),
        "--encoder".into(),
        "x265".into(),
        "-p".into(),
        format!("quality={quality}"),
        "-p".into(),
        "preset=slow".into(),
        "-p".into(),
        "tune=ssim".into(),
        "-p".into(),
        "complexity=80".into(),
        "-p".into(),
        "chroma=420".into(),
        "--output".into(),
        lossy(heic),
        lossy(png),
    ]
}

pub fn avifenc_args(png: &Path, avif: &Path, quality: u32, range: DynamicRange) -> Vec<String> {
    let color = match range {
        DynamicRange::Sdr => AVIF_SDR,
        DynamicRange::Hdr => AVIF_HDR,
    };
    vec![
        "--codec".into(),
        "aom".into(),
        "--speed".into(),
        "6".into(),
        "--qcolor".into(),
        quality.to_string(),
        "--yuv".into(),
        "420".into(),
        "--range".into(),
        "full".into(),
        "--depth".into(),
        color.depth.into(),
        "--cicp".into(),
        color.cicp.into(),
        "--jobs".into(),
        "all".into(),
        "--ignore-icc".into(),
        "--advanced".into(),
        "enable-chroma-deltaq=1".into(),
        lossy(png),
        lossy(avif),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn p(name: &str) -> PathBuf {
        PathBuf::from(name)
    }

    #[test]
    fn ffmpeg_bridge_forces_rgb24_bmp() {
        assert_eq!(
            ffmpeg_bmp_args(&p("in.png"), &p("Tempfile.bmp")),
            ["-y", "-i", "in.png", "-pix_fmt", "rgb24", "Tempfile.bmp"]
        );
    }

    #[test]
    fn cjpeg_uses_eight_bit_precision() {
        assert_eq!(
            cjpeg_args(&p("Tempfile.bmp"), &p("Tempfile.jpg"), 95),
            [
                "-quality",
                "95",
                "-optimize",
                "-precision",
                "8",
                "-outfile",
                "Tempfile.jpg",
                "Tempfile.bmp"
            ]
        );
    }

    #[test]
    fn cjxl_adds_pq_color_space_only_for_hdr() {
        let sdr = cjxl_args(&p("in.png"), &p("out.jxl"), 99, DynamicRange::Sdr);
        assert!(!sdr.iter().any(|a| a.contains("color_space")));

        let hdr = cjxl_args(&p("in.png"), &p("out.jxl"), 99, DynamicRange::Hdr);
        assert_eq!(
            &hdr[hdr.len() - 2..],
            ["-x", "color_space=RGB_D65_202_Rel_PeQ"]
        );
        assert_eq!(&hdr[..sdr.len()], &sdr[..]);
    }

    #[test]
    fn heif_enc_color_signaling_differs_by_range() {
        let sdr = heif_enc_args(&p("in.png"), &p("out.heic"), 99, DynamicRange::Sdr);
        let hdr = heif_enc_args(&p("in.png"), &p("out.heic"), 99, DynamicRange::Hdr);

        for (args, depth, matrix, primaries) in [(&sdr, "8", "6", "1"), (&hdr, "10", "9", "9")] {
            assert!(args.windows(2).any(|w| w == ["--bit-depth", depth]));
            assert!(args
                .windows(2)
                .any(|w| w == ["--matrix_coefficients", matrix]));
            assert!(args
                .windows(2)
                .any(|w| w == ["--colour_primaries", primaries]));
            assert!(args
                .windows(2)
                .any(|w| w == ["--transfer_characteristic", "13"]));
        }
        // x265 tuning is shared between both variants.
        assert!(sdr.windows(2).any(|w| w == ["-p", "quality=99"]));
        assert_eq!(sdr.last().map(String::as_str), Some("in.png"));
    }

    #[test]
    fn avifenc_color_signaling_differs_by_range() {
        let sdr = avifenc_args(&p("in.png"), &p("out.avif"), 99, DynamicRange::Sdr);
        let hdr = avifenc_args(&p("in.png"), &p("out.avif"), 99, DynamicRange::Hdr);

        assert!(sdr.windows(2).any(|w| w == ["--cicp", "1/13/6"]));
        assert!(sdr.windows(2).any(|w| w == ["--depth", "8"]));
        assert!(hdr.windows(2).any(|w| w == ["--cicp", "9/16/9"]));
        assert!(hdr.windows(2).any(|w| w == ["--depth", "10"]));
        assert!(sdr
            .windows(2)
            .any(|w| w == ["--advanced", "enable-chroma-deltaq=1"]));
    }
}
