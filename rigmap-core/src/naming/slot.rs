use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::registry::normalize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown humanoid slot '{0}'")]
pub struct UnknownSlot(pub String);

macro_rules! human_slots {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Standard humanoid joints an avatar may bind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum HumanSlot {
            $( #[serde(rename = $name)] $variant, )*
        }

        impl HumanSlot {
            pub const ALL: &'static [HumanSlot] = &[$(HumanSlot::$variant),*];

            pub fn name(self) -> &'static str {
                match self {
                    $( HumanSlot::$variant => $name, )*
                }
            }
        }
    };
}

human_slots! {
    Hips => "hips",
    Spine => "spine",
    Chest => "chest",
    UpperChest => "upper_chest",
    Neck => "neck",
    Head => "head",
    Jaw => "jaw",
    LeftEye => "left_eye",
    RightEye => "right_eye",
    LeftShoulder => "left_shoulder",
    LeftUpperArm => "left_upper_arm",
    LeftLowerArm => "left_lower_arm",
    LeftHand => "left_hand",
    RightShoulder => "right_shoulder",
    RightUpperArm => "right_upper_arm",
    RightLowerArm => "right_lower_arm",
    RightHand => "right_hand",
    LeftUpperLeg => "left_upper_leg",
    LeftLowerLeg => "left_lower_leg",
    LeftFoot => "left_foot",
    LeftToes => "left_toes",
    RightUpperLeg => "right_upper_leg",
    RightLowerLeg => "right_lower_leg",
    RightFoot => "right_foot",
    RightToes => "right_toes",
    LeftThumbProximal => "left_thumb_proximal",
    LeftThumbIntermediate => "left_thumb_intermediate",
    LeftThumbDistal => "left_thumb_distal",
    LeftIndexProximal => "left_index_proximal",
    LeftIndexIntermediate => "left_index_intermediate",
    LeftIndexDistal => "left_index_distal",
    LeftMiddleProximal => "left_middle_proximal",
    LeftMiddleIntermediate => "left_middle_intermediate",
    LeftMiddleDistal => "left_middle_distal",
    LeftRingProximal => "left_ring_proximal",
    LeftRingIntermediate => "left_ring_intermediate",
    LeftRingDistal => "left_ring_distal",
    LeftLittleProximal => "left_little_proximal",
    LeftLittleIntermediate => "left_little_intermediate",
    LeftLittleDistal => "left_little_distal",
    RightThumbProximal => "right_thumb_proximal",
    RightThumbIntermediate => "right_thumb_intermediate",
    RightThumbDistal => "right_thumb_distal",
    RightIndexProximal => "right_index_proximal",
    RightIndexIntermediate => "right_index_intermediate",
    RightIndexDistal => "right_index_distal",
    RightMiddleProximal => "right_middle_proximal",
    RightMiddleIntermediate => "right_middle_intermediate",
    RightMiddleDistal => "right_middle_distal",
    RightRingProximal => "right_ring_proximal",
    RightRingIntermediate => "right_ring_intermediate",
    RightRingDistal => "right_ring_distal",
    RightLittleProximal => "right_little_proximal",
    RightLittleIntermediate => "right_little_intermediate",
    RightLittleDistal => "right_little_distal",
}

impl HumanSlot {
    /// Torso, head and limb slots used to locate an armature root.
    pub const BROAD: [HumanSlot; 20] = [
        HumanSlot::Hips,
        HumanSlot::Spine,
        HumanSlot::Chest,
        HumanSlot::UpperChest,
        HumanSlot::Neck,
        HumanSlot::Head,
        HumanSlot::LeftShoulder,
        HumanSlot::LeftUpperArm,
        HumanSlot::LeftLowerArm,
        HumanSlot::LeftHand,
        HumanSlot::RightShoulder,
        HumanSlot::RightUpperArm,
        HumanSlot::RightLowerArm,
        HumanSlot::RightHand,
        HumanSlot::LeftUpperLeg,
        HumanSlot::LeftLowerLeg,
        HumanSlot::LeftFoot,
        HumanSlot::RightUpperLeg,
        HumanSlot::RightLowerLeg,
        HumanSlot::RightFoot,
    ];

    /// Slots counted when scoring root candidates.
    pub const CORE: [HumanSlot; 8] = [
        HumanSlot::Hips,
        HumanSlot::Spine,
        HumanSlot::Chest,
        HumanSlot::Head,
        HumanSlot::LeftUpperArm,
        HumanSlot::RightUpperArm,
        HumanSlot::LeftUpperLeg,
        HumanSlot::RightUpperLeg,
    ];
}

impl fmt::Display for HumanSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HumanSlot {
    type Err = UnknownSlot;

    /// Accepts `left_upper_arm`, `LeftUpperArm`, `left upper arm` and similar.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        HumanSlot::ALL
            .iter()
            .copied()
            .find(|slot| normalize(slot.name()) == wanted)
            .ok_or_else(|| UnknownSlot(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_every_standard_joint() {
        assert_eq!(HumanSlot::ALL.len(), 55);
        assert_eq!(HumanSlot::BROAD.len(), 20);
        assert!(HumanSlot::BROAD.contains(&HumanSlot::LeftShoulder));
        assert!(!HumanSlot::BROAD.contains(&HumanSlot::Jaw));
        for slot in HumanSlot::BROAD.iter().chain(HumanSlot::CORE.iter()) {
            assert!(HumanSlot::ALL.contains(slot));
        }
    }

    #[test]
    fn parses_loose_spellings() {
        assert_eq!("LeftUpperArm".parse::<HumanSlot>().unwrap(), HumanSlot::LeftUpperArm);
        assert_eq!("right_little_distal".parse::<HumanSlot>().unwrap(), HumanSlot::RightLittleDistal);
        assert!("tail".parse::<HumanSlot>().is_err());
    }

    #[test]
    fn serde_names_match_display() {
        let yaml = serde_yaml::to_string(&HumanSlot::UpperChest).unwrap();
        assert_eq!(yaml.trim(), "upper_chest");
        let back: HumanSlot = serde_yaml::from_str("left_toes").unwrap();
        assert_eq!(back, HumanSlot::LeftToes);
    }
}
