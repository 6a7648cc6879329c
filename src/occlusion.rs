//! # Occlusion モジュール
//!
//! ミサイルから見た防護対象の視錐を、煙幕球が完全に覆っているかを判定します。
//!
//! 円柱の正確なシルエットは計算せず、雲の深さでの視錐断面を
//! 「半径 × 半高」の矩形とみなし、その対角線を最大半径とする保守的な近似を用います。
//!
//! ## 判定手順
//!
//! 1. ミサイル→対象中心 `vec_mt`、ミサイル→雲中心 `vec_ms` を求める
//! 2. 雲が視線上でミサイルと対象の間にない場合は遮蔽なし
//! 3. 雲の深さでの視錐断面（半径・半高）を距離比で縮小
//! 4. 雲中心と視線中心線との垂直オフセットを求める
//! 5. `offset + 最大視錐半径 ≤ 雲半径` なら完全遮蔽

use crate::error::SimulationError;
use crate::models::{Position3D, Target};

/// 判定の中間量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcclusionGeometry {
    /// `dot(vec_ms, vec_mt)`
    pub projection: f64,
    /// `dot(vec_mt, vec_mt)`
    pub sight_line_length_sq: f64,
    /// 雲が視線上でミサイルと対象の間にあるか
    pub between: bool,
    /// 雲中心と視線中心線のオフセット距離（`between` が偽なら 0）
    pub offset_distance: f64,
    /// 雲の深さでの最大視錐半径（`between` が偽なら 0）
    pub max_cone_radius: f64,
    /// 完全遮蔽か
    pub fully_occluded: bool,
}

/// 判定の中間量を含めて評価する
///
/// ミサイル位置と対象中心が一致する場合は `DegenerateGeometry` を返します。
pub fn evaluate_occlusion(
    missile_pos: Position3D,
    cloud_center: Position3D,
    cloud_radius: f64,
    target: &Target,
) -> Result<OcclusionGeometry, SimulationError> {
    let vec_mt = target.center - missile_pos;
    let vec_ms = cloud_center - missile_pos;
    let dist_mt_sq = vec_mt.dot(&vec_mt);
    if dist_mt_sq == 0.0 || !dist_mt_sq.is_finite() {
        return Err(SimulationError::degenerate("missile position coincides with target center"));
    }

    let projection = vec_ms.dot(&vec_mt);
    if projection <= 0.0 || projection >= dist_mt_sq {
        return Ok(OcclusionGeometry {
            projection,
            sight_line_length_sq: dist_mt_sq,
            between: false,
            offset_distance: 0.0,
            max_cone_radius: 0.0,
            fully_occluded: false,
        });
    }

    let dist_mt = dist_mt_sq.sqrt();
    let dist_ms = vec_ms.magnitude();
    let ratio = dist_ms / dist_mt;

    let cone_radius = target.radius * ratio;
    let cone_half_height = target.half_height * ratio;

    // 視線中心線上で雲と同じ深さの点
    let sight_dir = vec_mt.normalize()?;
    let centerline_point = missile_pos + sight_dir * dist_ms;
    let offset_distance = (cloud_center - centerline_point).magnitude();

    let max_cone_radius = (cone_radius.powi(2) + cone_half_height.powi(2)).sqrt();

    Ok(OcclusionGeometry {
        projection,
        sight_line_length_sq: dist_mt_sq,
        between: true,
        offset_distance,
        max_cone_radius,
        fully_occluded: offset_distance + max_cone_radius <= cloud_radius,
    })
}

/// 煙幕球が対象の視錐を完全に覆っているか
pub fn is_fully_occluded(
    missile_pos: Position3D,
    cloud_center: Position3D,
    cloud_radius: f64,
    target: &Target,
) -> Result<bool, SimulationError> {
    evaluate_occlusion(missile_pos, cloud_center, cloud_radius, target).map(|g| g.fully_occluded)
}
