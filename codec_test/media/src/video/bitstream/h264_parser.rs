//! H.264 slice QP extraction.
//!
//! Parses just enough of the SPS, PPS and slice header syntax (ITU-T H.264
//! sections 7.3.2.1, 7.3.2.2 and 7.3.3) to reach `slice_qp_delta`, from
//! which the slice QP is `26 + pic_init_qp_minus26 + slice_qp_delta`.
//! Parameter sets are retained across calls, so a stream can be fed one
//! access unit at a time.

use super::bit_reader::BitReader;
use crate::error::{MediaError, Result};
use crate::video::constants::h264::*;
use crate::video::utils::{split_nal_units, unescape_rbsp};
use std::collections::HashMap;

/// Profiles whose SPS carries chroma format, bit depth and scaling lists.
const HIGH_PROFILES: [u32; 13] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// Fields of a sequence parameter set needed to walk a slice header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpsState {
    pub id: u32,
    pub chroma_format_idc: u32,
    pub separate_colour_plane: bool,
    pub log2_max_frame_num: u32,
    pub pic_order_cnt_type: u32,
    pub log2_max_pic_order_cnt_lsb: u32,
    pub delta_pic_order_always_zero: bool,
    pub frame_mbs_only: bool,
}

/// Fields of a picture parameter set needed to walk a slice header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpsState {
    pub id: u32,
    pub sps_id: u32,
    pub entropy_coding_mode: bool,
    pub bottom_field_pic_order_in_frame_present: bool,
    pub num_ref_idx_l0_default_active_minus1: u32,
    pub num_ref_idx_l1_default_active_minus1: u32,
    pub weighted_pred: bool,
    pub weighted_bipred_idc: u32,
    pub pic_init_qp_minus26: i32,
    pub redundant_pic_cnt_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SliceType {
    P,
    B,
    I,
    Sp,
    Si,
}

impl SliceType {
    /// Values 5..=9 mean "all slices of the picture share this type".
    fn from_raw(raw: u32) -> Self {
        match raw % 5 {
            0 => SliceType::P,
            1 => SliceType::B,
            2 => SliceType::I,
            3 => SliceType::Sp,
            _ => SliceType::Si,
        }
    }

    fn is_intra(self) -> bool {
        matches!(self, SliceType::I | SliceType::Si)
    }
}

/// Stateful H.264 Annex-B parser tracking the QP of the last slice.
#[derive(Debug, Default)]
pub struct H264BitstreamParser {
    sps: HashMap<u32, SpsState>,
    pps: HashMap<u32, PpsState>,
    last_slice_qp: Option<u8>,
}

impl H264BitstreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every NAL unit in an Annex-B buffer.
    ///
    /// Parameter sets update the stored state; coded slices set the last
    /// slice QP. The QP is cleared first, so a buffer without a parsable
    /// slice reports none. Slices referring to unknown parameter sets are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Bitstream` for a truncated or out-of-range
    /// parameter set or slice header.
    pub fn parse_bitstream(&mut self, data: &[u8]) -> Result<()> {
        self.last_slice_qp = None;
        for nal in split_nal_units(data) {
            self.parse_nal_unit(nal)?;
        }
        Ok(())
    }

    /// QP of the most recently parsed slice, if any.
    pub fn last_slice_qp(&self) -> Option<u8> {
        self.last_slice_qp
    }

    pub fn sps(&self, id: u32) -> Option<&SpsState> {
        self.sps.get(&id)
    }

    pub fn pps(&self, id: u32) -> Option<&PpsState> {
        self.pps.get(&id)
    }

    fn parse_nal_unit(&mut self, nal: &[u8]) -> Result<()> {
        let Some(&header) = nal.first() else {
            return Ok(());
        };
        let nal_type = header & NAL_TYPE_MASK;
        let nal_ref_idc = (header & NAL_REF_IDC_MASK) >> 5;
        let rbsp = unescape_rbsp(&nal[1..]);

        match nal_type {
            NAL_TYPE_SPS => {
                let sps = parse_sps(&rbsp)?;
                self.sps.insert(sps.id, sps);
            }
            NAL_TYPE_PPS => {
                let pps = parse_pps(&rbsp)?;
                self.pps.insert(pps.id, pps);
            }
            NAL_TYPE_NON_IDR | NAL_TYPE_IDR => {
                if let Some(qp) = self.parse_slice_qp(&rbsp, nal_type, nal_ref_idc)? {
                    self.last_slice_qp = Some(qp);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn parse_slice_qp(&self, rbsp: &[u8], nal_type: u8, nal_ref_idc: u8) -> Result<Option<u8>> {
        let mut r = BitReader::new(rbsp);

        let _first_mb_in_slice = r.read_ue()?;
        let slice_type = SliceType::from_raw(r.read_ue()?);
        let pps_id = r.read_ue()?;

        let Some(pps) = self.pps.get(&pps_id) else {
            return Ok(None);
        };
        let Some(sps) = self.sps.get(&pps.sps_id) else {
            return Ok(None);
        };

        if sps.separate_colour_plane {
            let _colour_plane_id = r.read_bits(2)?;
        }
        let _frame_num = r.read_bits(sps.log2_max_frame_num as u8)?;

        let mut field_pic = false;
        if !sps.frame_mbs_only {
            field_pic = r.read_flag()?;
            if field_pic {
                let _bottom_field = r.read_flag()?;
            }
        }

        if nal_type == NAL_TYPE_IDR {
            let _idr_pic_id = r.read_ue()?;
        }

        if sps.pic_order_cnt_type == 0 {
            let _poc_lsb = r.read_bits(sps.log2_max_pic_order_cnt_lsb as u8)?;
            if pps.bottom_field_pic_order_in_frame_present && !field_pic {
                let _delta_poc_bottom = r.read_se()?;
            }
        }
        if sps.pic_order_cnt_type == 1 && !sps.delta_pic_order_always_zero {
            let _delta_poc_0 = r.read_se()?;
            if pps.bottom_field_pic_order_in_frame_present && !field_pic {
                let _delta_poc_1 = r.read_se()?;
            }
        }

        if pps.redundant_pic_cnt_present {
            let _redundant_pic_cnt = r.read_ue()?;
        }

        if slice_type == SliceType::B {
            let _direct_spatial_mv_pred = r.read_flag()?;
        }

        let mut num_ref_idx_l0_active_minus1 = pps.num_ref_idx_l0_default_active_minus1;
        let mut num_ref_idx_l1_active_minus1 = pps.num_ref_idx_l1_default_active_minus1;
        if matches!(slice_type, SliceType::P | SliceType::Sp | SliceType::B)
            && r.read_flag()?
        {
            num_ref_idx_l0_active_minus1 = r.read_ue()?;
            if slice_type == SliceType::B {
                num_ref_idx_l1_active_minus1 = r.read_ue()?;
            }
        }

        // ref_pic_list_modification()
        if !slice_type.is_intra() {
            skip_ref_pic_list_modification(&mut r)?;
            if slice_type == SliceType::B {
                skip_ref_pic_list_modification(&mut r)?;
            }
        }

        let explicit_weights = (pps.weighted_pred
            && matches!(slice_type, SliceType::P | SliceType::Sp))
            || (pps.weighted_bipred_idc == 1 && slice_type == SliceType::B);
        if explicit_weights {
            let chroma_array_type = if sps.separate_colour_plane {
                0
            } else {
                sps.chroma_format_idc
            };
            skip_pred_weight_table(
                &mut r,
                chroma_array_type,
                num_ref_idx_l0_active_minus1,
                (slice_type == SliceType::B).then_some(num_ref_idx_l1_active_minus1),
            )?;
        }

        if nal_ref_idc != 0 {
            skip_dec_ref_pic_marking(&mut r, nal_type == NAL_TYPE_IDR)?;
        }

        if pps.entropy_coding_mode && !slice_type.is_intra() {
            let _cabac_init_idc = r.read_ue()?;
        }

        let slice_qp_delta = r.read_se()?;
        let qp = QP_BASE
            .checked_add(pps.pic_init_qp_minus26)
            .and_then(|qp| qp.checked_add(slice_qp_delta))
            .filter(|qp| (0..=MAX_QP).contains(qp))
            .ok_or_else(|| {
                MediaError::Bitstream(format!(
                    "slice QP out of range (pic_init_qp_minus26 {}, slice_qp_delta {})",
                    pps.pic_init_qp_minus26, slice_qp_delta
                ))
            })?;
        Ok(Some(qp as u8))
    }
}

/// Parses an SPS RBSP (without the NAL header byte).
pub fn parse_sps(rbsp: &[u8]) -> Result<SpsState> {
    let mut r = BitReader::new(rbsp);

    let profile_idc = r.read_bits(8)?;
    let _constraint_flags = r.read_bits(8)?;
    let _level_idc = r.read_bits(8)?;
    let id = r.read_ue()?;

    let mut chroma_format_idc = 1;
    let mut separate_colour_plane = false;
    if HIGH_PROFILES.contains(&profile_idc) {
        chroma_format_idc = r.read_ue()?;
        if chroma_format_idc == 3 {
            separate_colour_plane = r.read_flag()?;
        }
        let _bit_depth_luma_minus8 = r.read_ue()?;
        let _bit_depth_chroma_minus8 = r.read_ue()?;
        let _qpprime_y_zero_transform_bypass = r.read_flag()?;
        if r.read_flag()? {
            let lists = if chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..lists {
                if r.read_flag()? {
                    skip_scaling_list(&mut r, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    let log2_max_frame_num = read_ue_at_most(&mut r, 12, "log2_max_frame_num_minus4")? + 4;
    let pic_order_cnt_type = r.read_ue()?;
    let mut log2_max_pic_order_cnt_lsb = 0;
    let mut delta_pic_order_always_zero = false;
    match pic_order_cnt_type {
        0 => {
            log2_max_pic_order_cnt_lsb =
                read_ue_at_most(&mut r, 12, "log2_max_pic_order_cnt_lsb_minus4")? + 4;
        }
        1 => {
            delta_pic_order_always_zero = r.read_flag()?;
            let _offset_for_non_ref_pic = r.read_se()?;
            let _offset_for_top_to_bottom_field = r.read_se()?;
            let cycle = r.read_ue()?;
            for _ in 0..cycle {
                let _offset_for_ref_frame = r.read_se()?;
            }
        }
        2 => {}
        other => {
            return Err(MediaError::Bitstream(format!(
                "invalid pic_order_cnt_type {}",
                other
            )));
        }
    }

    let _max_num_ref_frames = r.read_ue()?;
    let _gaps_in_frame_num_allowed = r.read_flag()?;
    let _pic_width_in_mbs_minus1 = r.read_ue()?;
    let _pic_height_in_map_units_minus1 = r.read_ue()?;
    let frame_mbs_only = r.read_flag()?;

    if log2_max_frame_num > 16 || log2_max_pic_order_cnt_lsb > 16 {
        return Err(MediaError::Bitstream(
            "frame_num / POC field wider than 16 bits".to_string(),
        ));
    }

    Ok(SpsState {
        id,
        chroma_format_idc,
        separate_colour_plane,
        log2_max_frame_num,
        pic_order_cnt_type,
        log2_max_pic_order_cnt_lsb,
        delta_pic_order_always_zero,
        frame_mbs_only,
    })
}

/// Parses a PPS RBSP (without the NAL header byte).
pub fn parse_pps(rbsp: &[u8]) -> Result<PpsState> {
    let mut r = BitReader::new(rbsp);

    let id = r.read_ue()?;
    let sps_id = r.read_ue()?;
    let entropy_coding_mode = r.read_flag()?;
    let bottom_field_pic_order_in_frame_present = r.read_flag()?;

    let num_slice_groups_minus1 = r.read_ue()?;
    if num_slice_groups_minus1 > 0 {
        skip_slice_group_map(&mut r, num_slice_groups_minus1)?;
    }

    let num_ref_idx_l0_default_active_minus1 = r.read_ue()?;
    let num_ref_idx_l1_default_active_minus1 = r.read_ue()?;
    let weighted_pred = r.read_flag()?;
    let weighted_bipred_idc = r.read_bits(2)?;
    let pic_init_qp_minus26 = r.read_se()?;
    if !(-QP_BASE..=MAX_QP - QP_BASE).contains(&pic_init_qp_minus26) {
        return Err(MediaError::Bitstream(format!(
            "pic_init_qp_minus26 {} out of range",
            pic_init_qp_minus26
        )));
    }
    let _pic_init_qs_minus26 = r.read_se()?;
    let _chroma_qp_index_offset = r.read_se()?;
    let _deblocking_filter_control_present = r.read_flag()?;
    let _constrained_intra_pred = r.read_flag()?;
    let redundant_pic_cnt_present = r.read_flag()?;

    Ok(PpsState {
        id,
        sps_id,
        entropy_coding_mode,
        bottom_field_pic_order_in_frame_present,
        num_ref_idx_l0_default_active_minus1,
        num_ref_idx_l1_default_active_minus1,
        weighted_pred,
        weighted_bipred_idc,
        pic_init_qp_minus26,
        redundant_pic_cnt_present,
    })
}

fn read_ue_at_most(r: &mut BitReader<'_>, max: u32, field: &str) -> Result<u32> {
    let value = r.read_ue()?;
    if value > max {
        return Err(MediaError::Bitstream(format!(
            "{} {} out of range",
            field, value
        )));
    }
    Ok(value)
}

fn skip_scaling_list(r: &mut BitReader<'_>, size: usize) -> Result<()> {
    let mut last_scale: i32 = 8;
    let mut next_scale: i32 = 8;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = r.read_se()?;
            if !(-128..=127).contains(&delta_scale) {
                return Err(MediaError::Bitstream(format!(
                    "delta_scale {} out of range",
                    delta_scale
                )));
            }
            next_scale = (last_scale + delta_scale + 256) % 256;
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Ok(())
}

fn skip_slice_group_map(r: &mut BitReader<'_>, num_slice_groups_minus1: u32) -> Result<()> {
    match r.read_ue()? {
        0 => {
            for _ in 0..=num_slice_groups_minus1 {
                let _run_length_minus1 = r.read_ue()?;
            }
        }
        2 => {
            for _ in 0..num_slice_groups_minus1 {
                let _top_left = r.read_ue()?;
                let _bottom_right = r.read_ue()?;
            }
        }
        3..=5 => {
            let _change_direction = r.read_flag()?;
            let _change_rate_minus1 = r.read_ue()?;
        }
        6 => {
            let pic_size_in_map_units = r.read_ue()? as usize + 1;
            let bits = (u32::BITS - num_slice_groups_minus1.leading_zeros()) as usize;
            r.skip_bits(pic_size_in_map_units * bits)?;
        }
        _ => {}
    }
    Ok(())
}

fn skip_ref_pic_list_modification(r: &mut BitReader<'_>) -> Result<()> {
    if !r.read_flag()? {
        return Ok(());
    }
    loop {
        match r.read_ue()? {
            3 => return Ok(()),
            0..=2 => {
                let _abs_diff_pic_num_or_long_term_pic_num = r.read_ue()?;
            }
            other => {
                return Err(MediaError::Bitstream(format!(
                    "invalid modification_of_pic_nums_idc {}",
                    other
                )));
            }
        }
    }
}

fn skip_weights(r: &mut BitReader<'_>, chroma_array_type: u32, count: u32) -> Result<()> {
    for _ in 0..=count {
        if r.read_flag()? {
            let _luma_weight = r.read_se()?;
            let _luma_offset = r.read_se()?;
        }
        if chroma_array_type != 0 && r.read_flag()? {
            for _ in 0..2 {
                let _chroma_weight = r.read_se()?;
                let _chroma_offset = r.read_se()?;
            }
        }
    }
    Ok(())
}

fn skip_pred_weight_table(
    r: &mut BitReader<'_>,
    chroma_array_type: u32,
    num_ref_idx_l0_active_minus1: u32,
    num_ref_idx_l1_active_minus1: Option<u32>,
) -> Result<()> {
    let _luma_log2_weight_denom = r.read_ue()?;
    if chroma_array_type != 0 {
        let _chroma_log2_weight_denom = r.read_ue()?;
    }
    skip_weights(r, chroma_array_type, num_ref_idx_l0_active_minus1)?;
    if let Some(l1) = num_ref_idx_l1_active_minus1 {
        skip_weights(r, chroma_array_type, l1)?;
    }
    Ok(())
}

fn skip_dec_ref_pic_marking(r: &mut BitReader<'_>, idr: bool) -> Result<()> {
    if idr {
        let _no_output_of_prior_pics = r.read_flag()?;
        let _long_term_reference = r.read_flag()?;
        return Ok(());
    }
    if !r.read_flag()? {
        return Ok(());
    }
    loop {
        let operation = r.read_ue()?;
        match operation {
            0 => return Ok(()),
            1 | 3 => {
                let _difference_of_pic_nums_minus1 = r.read_ue()?;
                if operation == 3 {
                    let _long_term_frame_idx = r.read_ue()?;
                }
            }
            2 => {
                let _long_term_pic_num = r.read_ue()?;
            }
            4 => {
                let _max_long_term_frame_idx_plus1 = r.read_ue()?;
            }
            5 => {}
            6 => {
                let _long_term_frame_idx = r.read_ue()?;
            }
            other => {
                return Err(MediaError::Bitstream(format!(
                    "invalid memory_management_control_operation {}",
                    other
                )));
            }
        }
    }
}
