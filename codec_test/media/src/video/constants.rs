//! Video-specific constants
//!
//! Constants for H.264 NAL parsing, YUV processing, and codec parameters.

/// H.264 NAL unit start codes and types
pub mod h264 {
    /// 4-byte NAL start code (0x00 0x00 0x00 0x01)
    pub const NAL_START_CODE_4: [u8; 4] = [0x00, 0x00, 0x00, 0x01];
    /// 3-byte NAL start code (0x00 0x00 0x01)
    pub const NAL_START_CODE_3: [u8; 3] = [0x00, 0x00, 0x01];
    /// NAL unit type mask (lower 5 bits)
    pub const NAL_TYPE_MASK: u8 = 0x1F;
    /// nal_ref_idc mask (bits 5-6)
    pub const NAL_REF_IDC_MASK: u8 = 0x60;
    /// NAL unit type: Non-IDR coded slice
    pub const NAL_TYPE_NON_IDR: u8 = 1;
    /// NAL unit type: IDR coded slice (keyframe)
    pub const NAL_TYPE_IDR: u8 = 5;
    /// NAL unit type: SPS (Sequence Parameter Set)
    pub const NAL_TYPE_SPS: u8 = 7;
    /// NAL unit type: PPS (Picture Parameter Set)
    pub const NAL_TYPE_PPS: u8 = 8;
    /// Emulation prevention byte inserted after two zero bytes
    pub const EMULATION_PREVENTION_BYTE: u8 = 0x03;
    /// Base added to pic_init_qp_minus26 and slice_qp_delta
    pub const QP_BASE: i32 = 26;
    /// Highest valid 8-bit luma QP
    pub const MAX_QP: i32 = 51;
}

/// YUV plane calculation constants
pub mod yuv {
    /// I420 plane count (Y, U, V)
    pub const PLANE_COUNT: usize = 3;
    /// Y plane index
    pub const Y_PLANE_INDEX: usize = 0;
    /// U plane index
    pub const U_PLANE_INDEX: usize = 1;
    /// V plane index
    pub const V_PLANE_INDEX: usize = 2;
    /// Largest 8-bit sample value
    pub const MAX_SAMPLE_VALUE: f64 = 255.0;
}

/// Quality measurement constants
pub mod quality {
    /// PSNR reported for identical images
    pub const MAX_PSNR_DB: f64 = 128.0;
}
