// 基本的なデータ型と物理定数
pub mod common;

// 運動モデルの基本インターフェース（trait）定義
pub mod traits;

// 各物体の運動モデル
pub mod target;
pub mod missile;
pub mod aircraft;
pub mod canister;
pub mod cloud;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use target::Target;
pub use missile::Missile;
pub use aircraft::Aircraft;
pub use canister::{Canister, ReleasePlan, canister_release_position, detonation_position};
pub use cloud::{SmokeCloud, SmokeProperties, cloud_center};
