//! Process-wide alias table and canonical -> humanoid slot registry.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::slot::HumanSlot;
use super::CanonicalKey;

/// Lowercases and strips whitespace, `_` and `.`. Idempotent.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '.')
        .flat_map(char::to_lowercase)
        .collect()
}

/// One canonical joint and the spellings that map to it.
struct Alias {
    canonical: &'static str,
    slot: Option<HumanSlot>,
    spellings: &'static [&'static str],
}

const ALIASES: &[Alias] = &[
    Alias { canonical: "hips", slot: Some(HumanSlot::Hips), spellings: &["Hips", "J_Bip_C_Hips"] },
    Alias { canonical: "spine", slot: Some(HumanSlot::Spine), spellings: &["Spine", "J_Bip_C_Spine"] },
    Alias { canonical: "chest", slot: Some(HumanSlot::Chest), spellings: &["Chest", "J_Bip_C_Chest"] },
    Alias {
        canonical: "upper_chest",
        slot: Some(HumanSlot::UpperChest),
        spellings: &["UpperChest", "Upper Chest", "J_Bip_C_UpperChest"],
    },
    Alias { canonical: "neck", slot: Some(HumanSlot::Neck), spellings: &["Neck", "J_Bip_C_Neck"] },
    Alias { canonical: "head", slot: Some(HumanSlot::Head), spellings: &["Head", "J_Bip_C_Head"] },
    Alias { canonical: "jaw", slot: Some(HumanSlot::Jaw), spellings: &["Jaw", "J_Bip_C_Jaw"] },
    Alias {
        canonical: "left_eye",
        slot: Some(HumanSlot::LeftEye),
        spellings: &["LeftEye", "Eye_L", "Eye.L", "J_Adj_L_FaceEye"],
    },
    Alias {
        canonical: "right_eye",
        slot: Some(HumanSlot::RightEye),
        spellings: &["RightEye", "Eye_R", "Eye.R", "J_Adj_R_FaceEye"],
    },
    Alias {
        canonical: "left_shoulder",
        slot: Some(HumanSlot::LeftShoulder),
        spellings: &["Shoulder_L", "Shoulder.L", "sholder_L", "LeftShoulder", "J_Bip_L_Shoulder"],
    },
    Alias {
        canonical: "left_arm",
        slot: Some(HumanSlot::LeftUpperArm),
        spellings: &["UpperArm_L", "Upper_arm.L", "Upper_Arm_L", "LeftUpperArm", "LeftArm", "J_Bip_L_UpperArm"],
    },
    Alias {
        canonical: "left_forearm",
        slot: Some(HumanSlot::LeftLowerArm),
        spellings: &["LowerArm_L", "Lower_arm.L", "Lower_Arm_L", "Forearm.L", "LeftLowerArm", "LeftForeArm",
            "J_Bip_L_LowerArm"],
    },
    Alias {
        canonical: "left_hand",
        slot: Some(HumanSlot::LeftHand),
        spellings: &["Hand_L", "Hand.L", "Left Hand", "LeftHand", "J_Bip_L_Hand"],
    },
    Alias {
        canonical: "right_shoulder",
        slot: Some(HumanSlot::RightShoulder),
        spellings: &["Shoulder_R", "Shoulder.R", "sholder_R", "RightShoulder", "J_Bip_R_Shoulder"],
    },
    Alias {
        canonical: "right_arm",
        slot: Some(HumanSlot::RightUpperArm),
        spellings: &["UpperArm_R", "Upper_arm.R", "Upper_Arm_R", "RightUpperArm", "RightArm", "J_Bip_R_UpperArm"],
    },
    Alias {
        canonical: "right_forearm",
        slot: Some(HumanSlot::RightLowerArm),
        spellings: &["LowerArm_R", "Lower_arm.R", "Lower_Arm_R", "Forearm.R", "RightLowerArm", "RightForeArm",
            "J_Bip_R_LowerArm"],
    },
    Alias {
        canonical: "right_hand",
        slot: Some(HumanSlot::RightHand),
        spellings: &["Hand_R", "Hand.R", "Right Hand", "RightHand", "J_Bip_R_Hand"],
    },
    Alias {
        canonical: "left_thigh",
        slot: Some(HumanSlot::LeftUpperLeg),
        spellings: &["UpperLeg_L", "Upper_leg.L", "Upper_Leg_L", "Thigh.L", "LeftUpperLeg", "LeftUpLeg",
            "J_Bip_L_UpperLeg"],
    },
    Alias {
        canonical: "left_calf",
        slot: Some(HumanSlot::LeftLowerLeg),
        spellings: &["LowerLeg_L", "Lower_leg.L", "Lower_Leg_L", "Calf.L", "LeftLowerLeg", "LeftLeg",
            "J_Bip_L_LowerLeg"],
    },
    Alias {
        canonical: "left_foot",
        slot: Some(HumanSlot::LeftFoot),
        spellings: &["Foot_L", "Foot.L", "LeftFoot", "J_Bip_L_Foot"],
    },
    Alias {
        canonical: "left_toe",
        slot: Some(HumanSlot::LeftToes),
        spellings: &["Toe_L", "Toe.L", "Toes.L", "Toes_L", "LeftToes", "LeftToeBase", "J_Bip_L_ToeBase"],
    },
    Alias {
        canonical: "right_thigh",
        slot: Some(HumanSlot::RightUpperLeg),
        spellings: &["UpperLeg_R", "Upper_leg.R", "Upper_Leg_R", "Thigh.R", "RightUpperLeg", "RightUpLeg",
            "J_Bip_R_UpperLeg"],
    },
    Alias {
        canonical: "right_calf",
        slot: Some(HumanSlot::RightLowerLeg),
        spellings: &["LowerLeg_R", "Lower_leg.R", "Lower_Leg_R", "Calf.R", "RightLowerLeg", "RightLeg",
            "J_Bip_R_LowerLeg"],
    },
    Alias {
        canonical: "right_foot",
        slot: Some(HumanSlot::RightFoot),
        spellings: &["Foot_R", "Foot.R", "RightFoot", "J_Bip_R_Foot"],
    },
    Alias {
        canonical: "right_toe",
        slot: Some(HumanSlot::RightToes),
        spellings: &["Toe_R", "Toe.R", "Toes.R", "Toes_R", "RightToes", "RightToeBase", "J_Bip_R_ToeBase"],
    },
    Alias {
        canonical: "left_thumb_proximal",
        slot: Some(HumanSlot::LeftThumbProximal),
        spellings: &["Thumb1_L", "Thumb Proximal.L", "Thumb.proximal.L", "Thumb Proximal_L", "ThumbProximal_L",
            "Thumb1.l", "LeftHandThumb1", "J_Bip_L_Thumb1"],
    },
    Alias {
        canonical: "left_thumb_intermediate",
        slot: Some(HumanSlot::LeftThumbIntermediate),
        spellings: &["Thumb2_L", "Thumb Intermediate.L", "Thumb.intermediate.L", "Thumb Intermediate_L",
            "ThumbIntermediate_L", "Thumb2.l", "LeftHandThumb2", "J_Bip_L_Thumb2"],
    },
    Alias {
        canonical: "left_thumb_distal",
        slot: Some(HumanSlot::LeftThumbDistal),
        spellings: &["Thumb3_L", "Thumb Distal.L", "Thumb.distal.L", "Thumb Distal_L", "ThumbDistal_L",
            "Thumb3.l", "LeftHandThumb3", "J_Bip_L_Thumb3"],
    },
    Alias {
        canonical: "left_index_proximal",
        slot: Some(HumanSlot::LeftIndexProximal),
        spellings: &["Index1_L", "Index Proximal.L", "Index.proximal.L", "Index Proximal_L", "IndexProximal_L",
            "Index1.l", "LeftHandIndex1", "J_Bip_L_Index1"],
    },
    Alias {
        canonical: "left_index_intermediate",
        slot: Some(HumanSlot::LeftIndexIntermediate),
        spellings: &["Index2_L", "Index Intermediate.L", "Index.intermediate.L", "Index Intermediate_L",
            "IndexIntermediate_L", "Index2.l", "LeftHandIndex2", "J_Bip_L_Index2"],
    },
    Alias {
        canonical: "left_index_distal",
        slot: Some(HumanSlot::LeftIndexDistal),
        spellings: &["Index3_L", "Index Distal.L", "Index.distal.L", "Index Distal_L", "IndexDistal_L",
            "Index3.l", "LeftHandIndex3", "J_Bip_L_Index3"],
    },
    Alias {
        canonical: "left_middle_proximal",
        slot: Some(HumanSlot::LeftMiddleProximal),
        spellings: &["Middle1_L", "Middle Proximal.L", "Middle.proximal.L", "Middle Proximal_L",
            "MiddleProximal_L", "Middle1.l", "LeftHandMiddle1", "J_Bip_L_Middle1"],
    },
    Alias {
        canonical: "left_middle_intermediate",
        slot: Some(HumanSlot::LeftMiddleIntermediate),
        spellings: &["Middle2_L", "Middle Intermediate.L", "Middle.intermediate.L", "Middle Intermediate_L",
            "MiddleIntermediate_L", "Middle2.l", "LeftHandMiddle2", "J_Bip_L_Middle2"],
    },
    Alias {
        canonical: "left_middle_distal",
        slot: Some(HumanSlot::LeftMiddleDistal),
        spellings: &["Middle3_L", "Middle Distal.L", "Middle.distal.L", "Middle Distal_L", "MiddleDistal_L",
            "Middle3.l", "LeftHandMiddle3", "J_Bip_L_Middle3"],
    },
    Alias {
        canonical: "left_ring_proximal",
        slot: Some(HumanSlot::LeftRingProximal),
        spellings: &["Ring1_L", "Ring Proximal.L", "Ring.proximal.L", "Ring Proximal_L", "RingProximal_L",
            "Ring1.l", "LeftHandRing1", "J_Bip_L_Ring1"],
    },
    Alias {
        canonical: "left_ring_intermediate",
        slot: Some(HumanSlot::LeftRingIntermediate),
        spellings: &["Ring2_L", "Ring Intermediate.L", "Ring.intermediate.L", "Ring Intermediate_L",
            "RingIntermediate_L", "Ring2.l", "LeftHandRing2", "J_Bip_L_Ring2"],
    },
    Alias {
        canonical: "left_ring_distal",
        slot: Some(HumanSlot::LeftRingDistal),
        spellings: &["Ring3_L", "Ring Distal.L", "Ring.distal.L", "Ring Distal_L", "RingDistal_L", "Ring3.l",
            "LeftHandRing3", "J_Bip_L_Ring3"],
    },
    Alias {
        canonical: "left_pinky_proximal",
        slot: Some(HumanSlot::LeftLittleProximal),
        spellings: &["Pinky1_L", "Little Proximal.L", "Little.proximal.L", "Little Proximal_L",
            "LittleProximal_L", "Little1.l", "LeftHandLittle1", "J_Bip_L_Little1"],
    },
    Alias {
        canonical: "left_pinky_intermediate",
        slot: Some(HumanSlot::LeftLittleIntermediate),
        spellings: &["Pinky2_L", "Little Intermediate.L", "Little.intermediate.L", "Little Intermediate_L",
            "LittleIntermediate_L", "Little2.l", "LeftHandLittle2", "J_Bip_L_Little2"],
    },
    Alias {
        canonical: "left_pinky_distal",
        slot: Some(HumanSlot::LeftLittleDistal),
        spellings: &["Pinky3_L", "Little Distal.L", "Little.distal.L", "Little Distal_L", "LittleDistal_L",
            "Little3.l", "LeftHandLittle3", "J_Bip_L_Little3"],
    },
    Alias {
        canonical: "right_thumb_proximal",
        slot: Some(HumanSlot::RightThumbProximal),
        spellings: &["Thumb1_R", "Thumb Proximal.R", "Thumb.proximal.R", "Thumb Proximal_R", "ThumbProximal_R",
            "Thumb1.r", "RightHandThumb1", "J_Bip_R_Thumb1"],
    },
    Alias {
        canonical: "right_thumb_intermediate",
        slot: Some(HumanSlot::RightThumbIntermediate),
        spellings: &["Thumb2_R", "Thumb Intermediate.R", "Thumb.intermediate.R", "Thumb Intermediate_R",
            "ThumbIntermediate_R", "Thumb2.r", "RightHandThumb2", "J_Bip_R_Thumb2"],
    },
    Alias {
        canonical: "right_thumb_distal",
        slot: Some(HumanSlot::RightThumbDistal),
        spellings: &["Thumb3_R", "Thumb Distal.R", "Thumb.distal.R", "Thumb Distal_R", "ThumbDistal_R",
            "Thumb3.r", "RightHandThumb3", "J_Bip_R_Thumb3"],
    },
    Alias {
        canonical: "right_index_proximal",
        slot: Some(HumanSlot::RightIndexProximal),
        spellings: &["Index1_R", "Index Proximal.R", "Index.proximal.R", "Index Proximal_R", "IndexProximal_R",
            "Index1.r", "RightHandIndex1", "J_Bip_R_Index1"],
    },
    Alias {
        canonical: "right_index_intermediate",
        slot: Some(HumanSlot::RightIndexIntermediate),
        spellings: &["Index2_R", "Index Intermediate.R", "Index.intermediate.R", "Index Intermediate_R",
            "IndexIntermediate_R", "Index2.r", "RightHandIndex2", "J_Bip_R_Index2"],
    },
    Alias {
        canonical: "right_index_distal",
        slot: Some(HumanSlot::RightIndexDistal),
        spellings: &["Index3_R", "Index Distal.R", "Index.distal.R", "Index Distal_R", "IndexDistal_R",
            "Index3.r", "RightHandIndex3", "J_Bip_R_Index3"],
    },
    Alias {
        canonical: "right_middle_proximal",
        slot: Some(HumanSlot::RightMiddleProximal),
        spellings: &["Middle1_R", "Middle Proximal.R", "Middle.proximal.R", "Middle Proximal_R",
            "MiddleProximal_R", "Middle1.r", "RightHandMiddle1", "J_Bip_R_Middle1"],
    },
    Alias {
        canonical: "right_middle_intermediate",
        slot: Some(HumanSlot::RightMiddleIntermediate),
        spellings: &["Middle2_R", "Middle Intermediate.R", "Middle.intermediate.R", "Middle Intermediate_R",
            "MiddleIntermediate_R", "Middle2.r", "RightHandMiddle2", "J_Bip_R_Middle2"],
    },
    Alias {
        canonical: "right_middle_distal",
        slot: Some(HumanSlot::RightMiddleDistal),
        spellings: &["Middle3_R", "Middle Distal.R", "Middle.distal.R", "Middle Distal_R", "MiddleDistal_R",
            "Middle3.r", "RightHandMiddle3", "J_Bip_R_Middle3"],
    },
    Alias {
        canonical: "right_ring_proximal",
        slot: Some(HumanSlot::RightRingProximal),
        spellings: &["Ring1_R", "Ring Proximal.R", "Ring.proximal.R", "Ring Proximal_R", "RingProximal_R",
            "Ring1.r", "RightHandRing1", "J_Bip_R_Ring1"],
    },
    Alias {
        canonical: "right_ring_intermediate",
        slot: Some(HumanSlot::RightRingIntermediate),
        spellings: &["Ring2_R", "Ring Intermediate.R", "Ring.intermediate.R", "Ring Intermediate_R",
            "RingIntermediate_R", "Ring2.r", "RightHandRing2", "J_Bip_R_Ring2"],
    },
    Alias {
        canonical: "right_ring_distal",
        slot: Some(HumanSlot::RightRingDistal),
        spellings: &["Ring3_R", "Ring Distal.R", "Ring.distal.R", "Ring Distal_R", "RingDistal_R", "Ring3.r",
            "RightHandRing3", "J_Bip_R_Ring3"],
    },
    Alias {
        canonical: "right_pinky_proximal",
        slot: Some(HumanSlot::RightLittleProximal),
        spellings: &["Pinky1_R", "Little Proximal.R", "Little.proximal.R", "Little Proximal_R",
            "LittleProximal_R", "Little1.r", "RightHandLittle1", "J_Bip_R_Little1"],
    },
    Alias {
        canonical: "right_pinky_intermediate",
        slot: Some(HumanSlot::RightLittleIntermediate),
        spellings: &["Pinky2_R", "Little Intermediate.R", "Little.intermediate.R", "Little Intermediate_R",
            "LittleIntermediate_R", "Little2.r", "RightHandLittle2", "J_Bip_R_Little2"],
    },
    Alias {
        canonical: "right_pinky_distal",
        slot: Some(HumanSlot::RightLittleDistal),
        spellings: &["Pinky3_R", "Little Distal.R", "Little.distal.R", "Little Distal_R", "LittleDistal_R",
            "Little3.r", "RightHandLittle3", "J_Bip_R_Little3"],
    },
    // tip bones: aliases only, no humanoid slot
    Alias { canonical: "left_eye_end", slot: None, spellings: &["Eye.L_end", "LeftEye_end"] },
    Alias { canonical: "right_eye_end", slot: None, spellings: &["Eye.R_end", "RightEye_end"] },
    Alias { canonical: "left_toe_end", slot: None, spellings: &["Toes.L_end", "Toe.L_end", "Toes_END"] },
    Alias { canonical: "right_toe_end", slot: None, spellings: &["Toes.R_end", "Toe.R_end", "Toes_END.001"] },
];

/// Alias table plus slot registry. Built once, read-only afterwards.
#[derive(Debug)]
pub struct Registry {
    aliases: HashMap<String, CanonicalKey>,
    slots: HashMap<CanonicalKey, HumanSlot>,
    by_slot: HashMap<HumanSlot, CanonicalKey>,
    spellings: Vec<(String, CanonicalKey)>,
}

impl Registry {
    fn build() -> Self {
        let mut reg = Registry {
            aliases: HashMap::new(),
            slots: HashMap::new(),
            by_slot: HashMap::new(),
            spellings: Vec::new(),
        };
        for entry in ALIASES {
            reg.register(entry.canonical, entry.slot, entry.spellings);
        }
        reg
    }

    /// First registration of a normalized spelling wins; the canonical key
    /// also registers itself.
    fn register(&mut self, canonical: &str, slot: Option<HumanSlot>, spellings: &[&str]) {
        let Some(key) = CanonicalKey::new(canonical) else {
            return;
        };
        for spelling in spellings {
            self.aliases.entry(normalize(spelling)).or_insert_with(|| key.clone());
            self.spellings.push((spelling.to_string(), key.clone()));
        }
        self.aliases.entry(normalize(canonical)).or_insert_with(|| key.clone());
        if let Some(slot) = slot {
            self.slots.insert(key.clone(), slot);
            self.by_slot.entry(slot).or_insert(key);
        }
    }

    /// Canonical key for any spelling of a joint name.
    pub fn canonical_of(&self, raw: &str) -> Option<CanonicalKey> {
        let key = normalize(raw);
        if key.is_empty() {
            return None;
        }
        self.aliases.get(&key).cloned()
    }

    pub fn slot_of(&self, canonical: &CanonicalKey) -> Option<HumanSlot> {
        self.slots.get(canonical).copied()
    }

    pub fn canonical_for_slot(&self, slot: HumanSlot) -> Option<&CanonicalKey> {
        self.by_slot.get(&slot)
    }

    /// Every seeded spelling with the canonical key it was registered under.
    pub fn spellings(&self) -> impl Iterator<Item = (&str, &CanonicalKey)> {
        self.spellings.iter().map(|(s, k)| (s.as_str(), k))
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::build)
}

pub fn canonical_of(raw: &str) -> Option<CanonicalKey> {
    registry().canonical_of(raw)
}

pub fn slot_of(canonical: &CanonicalKey) -> Option<HumanSlot> {
    registry().slot_of(canonical)
}

pub fn canonical_for_slot(slot: HumanSlot) -> Option<CanonicalKey> {
    registry().canonical_for_slot(slot).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_strips_separators() {
        assert_eq!(normalize(" Upper_Arm.L "), "upperarml");
        assert_eq!(normalize("Left Hand"), "lefthand");
        assert_eq!(normalize("\t_"), "");
    }

    #[test]
    fn every_alias_maps_back_to_its_canonical() {
        let reg = registry();
        assert!(reg.alias_count() > 100);
        for (spelling, key) in reg.spellings() {
            assert_eq!(reg.canonical_of(spelling).as_ref(), Some(key), "alias {spelling}");
        }
    }

    #[test]
    fn canonical_keys_register_themselves() {
        for key in ["hips", "left_arm", "right_pinky_distal", "left_toe_end"] {
            assert_eq!(canonical_of(key).unwrap().as_str(), key);
        }
    }

    #[test]
    fn common_spellings_resolve() {
        let cases = [
            ("Hand.L", "left_hand"),
            ("hand.r", "right_hand"),
            ("Left Hand", "left_hand"),
            ("sholder_L", "left_shoulder"),
            ("UpperLeg.L", "left_thigh"),
            ("Little Proximal.L", "left_pinky_proximal"),
            ("Pinky3_R", "right_pinky_distal"),
            ("Thumb1.l", "left_thumb_proximal"),
            ("J_Bip_C_UpperChest", "upper_chest"),
            ("J_Bip_R_LowerArm", "right_forearm"),
            ("LeftUpLeg", "left_thigh"),
            ("Toes_END.001", "right_toe_end"),
            ("LeftForeArm", "left_forearm"),
            ("J_Bip_L_Little2", "left_pinky_intermediate"),
        ];
        for (raw, expected) in cases {
            assert_eq!(canonical_of(raw).map(|k| k.to_string()).as_deref(), Some(expected), "{raw}");
        }
        assert!(canonical_of("Armature").is_none());
        assert!(canonical_of("J_Bip_L_Sholder").is_none());
        assert!(canonical_of("").is_none());
    }

    #[test]
    fn slot_registry_covers_all_slots() {
        let reg = registry();
        assert_eq!(reg.slot_count(), HumanSlot::ALL.len());
        for slot in HumanSlot::ALL {
            let key = reg.canonical_for_slot(*slot).unwrap();
            assert_eq!(reg.slot_of(key), Some(*slot));
        }
        let tip = canonical_of("Eye.L_end").unwrap();
        assert_eq!(slot_of(&tip), None);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in "[A-Za-z0-9 _.\\-\t]{0,24}") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn normalize_ignores_separator_placement(raw in "[A-Za-z]{1,12}") {
            let decorated = format!(" {}_.", raw.to_uppercase());
            prop_assert_eq!(normalize(&decorated), raw.to_lowercase());
        }
    }
}
