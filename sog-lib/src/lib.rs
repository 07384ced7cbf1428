pub mod common;
mod decode;
pub mod error;
mod ply;
mod splats;
mod structures;
#[cfg(test)]
mod testing;
mod unpack;

pub use decode::{decode, DEFAULT_COLOR, DEFAULT_OPACITY, DEFAULT_ROTATION, DEFAULT_SCALE};
pub use error::{ErrorClass, SogError, SogResult};
pub use ply::write_ply;
pub use splats::{SogDataV2, Splat, SplatView};
pub use structures::{
    AttributeFamily, Compression, ContainerHeader, Encoding, FormatVersion, Layout,
    PlaneDescriptor,
};
pub use unpack::{unpack, ParsedContainer, QuantizedPlane};

/// Unpacks and decodes a complete container in one step.
#[inline(never)]
pub fn decode_bytes(sog_data: &[u8]) -> SogResult<SogDataV2> {
    let mut container = unpack(sog_data)?;
    decode(&mut container)
}

cfg_if::cfg_if! {
if #[cfg(feature = "async")] {
    use tokio::io::{AsyncRead, AsyncReadExt};

    /// Reads a whole container into memory. Decoding needs the complete buffer.
    #[inline(never)]
    pub async fn read_container_async<R>(reader: &mut R) -> SogResult<Vec<u8>>
    where
        R: AsyncRead + Unpin,
    {
        let mut sog_data = Vec::new();
        reader.read_to_end(&mut sog_data).await?;
        Ok(sog_data)
    }

    #[inline(never)]
    pub async fn decode_async<R>(reader: &mut R) -> SogResult<SogDataV2>
    where
        R: AsyncRead + Unpin,
    {
        let sog_data = read_container_async(reader).await?;
        decode_bytes(&sog_data)
    }
}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn create_test_container() -> Vec<u8> {
        #[rustfmt::skip]
        let positions = [
            // x, y, z
            0.0f32, 0.1, 0.2,
            -1.0, 2.0, 30.0,
        ];
        let (scales, scale_params) = quantize_log_u8(&[0.01, 0.02, 0.03, 0.5, 0.5, 0.5]);
        let rotations = [
            pack_quat_smallest3([0.0, 0.0, 0.0, 1.0]),
            pack_quat_smallest3([0.5, 0.5, 0.5, 0.5]),
        ]
        .concat();

        ContainerBuilder::new(2)
            .antialiased(true)
            .plane(PlaneFixture::raw(
                AttributeFamily::Position,
                Encoding::F32,
                3,
                f32_bytes(&positions),
            ))
            .plane(
                PlaneFixture::raw(AttributeFamily::Scale, Encoding::LogU8, 3, scales)
                    .params(scale_params)
                    .zstd(),
            )
            .plane(PlaneFixture::raw(
                AttributeFamily::Rotation,
                Encoding::QuatSmallest3,
                4,
                rotations,
            ))
            .plane(PlaneFixture::raw(
                AttributeFamily::Color,
                Encoding::U8,
                4,
                vec![255, 128, 0, 255, 0, 0, 255, 64],
            ))
            .build()
    }

    fn validate_splats(data: SogDataV2) {
        assert!(data.antialiased().unwrap());
        assert_eq!(data.count().unwrap(), 2);
        data.scoped(|view| {
            let first = view.splat(0).unwrap();
            assert_eq!(first.position.to_array(), [0.0, 0.1, 0.2]);
            assert!((first.scale.x - 0.01).abs() < 1e-3);
            assert_eq!(first.opacity, 1.0);
            let second = view.splat(1).unwrap();
            assert!((second.rotation.length() - 1.0).abs() < 1e-4);
            assert!((second.opacity - 64.0 / 255.0).abs() < 1e-6);
            assert!(view.splat(2).is_none());
            assert_eq!(view.splats().count(), 2);
        })
        .unwrap();
    }

    #[test]
    fn test_decode_bytes() {
        validate_splats(decode_bytes(&create_test_container()).expect("decode_bytes failed"));
    }

    #[test]
    fn test_decode_then_write_ply() {
        let data = decode_bytes(&create_test_container()).unwrap();
        let mut out_ply = Vec::new();
        data.scoped(|view| write_ply(&mut out_ply, &view, false))
            .unwrap()
            .unwrap();

        let text = String::from_utf8_lossy(&out_ply);
        assert!(text.starts_with("ply\n"));
        assert!(text.contains("element vertex 2\n"));
    }

    #[test]
    fn test_errors_carry_their_class() {
        let bytes = create_test_container();
        assert_eq!(
            decode_bytes(&bytes[..10]).unwrap_err().class(),
            ErrorClass::Structural
        );
        let mut bad = bytes.clone();
        bad[..4].copy_from_slice(b"PLY!");
        assert!(matches!(
            decode_bytes(&bad).unwrap_err(),
            SogError::InvalidMagic(magic) if &magic == b"PLY!"
        ));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_decode_async() {
        let bytes = create_test_container();

        let read = read_container_async(&mut &bytes[..])
            .await
            .expect("read_container_async failed");
        assert_eq!(read, bytes);

        let data = decode_async(&mut &bytes[..])
            .await
            .expect("decode_async failed");
        validate_splats(data);
    }
}
