//! Static catalog of photoshoot style templates.
//!
//! Every directive asks the model to keep the scene of the original photo and
//! only change pose, framing or expression.

use strum::IntoEnumIterator;

use crate::models::job::{JobSpec, RunSelection, StyleCategory};
use crate::services::dispatcher::DispatchError;

macro_rules! keep_scene {
    ($lead:literal) => {
        concat!(
            $lead,
            " Maintain the exact same background, clothing, lighting, and overall style as the original image."
        )
    };
}

static STYLES: &[JobSpec] = &[
    JobSpec {
        name: "Smiling Portrait",
        directive: keep_scene!(
            "A portrait of the person from the original photo, but they are smiling warmly at the camera."
        ),
        category: StyleCategory::Portraits,
    },
    JobSpec {
        name: "Laughing Portrait",
        directive: keep_scene!(
            "A portrait of the person from the original photo, captured mid-laugh, looking genuinely happy."
        ),
        category: StyleCategory::Portraits,
    },
    JobSpec {
        name: "Serious Close-up",
        directive: keep_scene!(
            "A dramatic close-up shot focusing on the person's face, with a serious and confident expression."
        ),
        category: StyleCategory::Portraits,
    },
    JobSpec {
        name: "Thoughtful Look",
        directive: keep_scene!(
            "A three-quarter portrait of the person from the original photo, but they are looking thoughtfully away from the camera, into the distance."
        ),
        category: StyleCategory::Portraits,
    },
    JobSpec {
        name: "Side Profile",
        directive: keep_scene!(
            "A portrait of the person from the original photo taken from a side profile angle."
        ),
        category: StyleCategory::Portraits,
    },
    JobSpec {
        name: "Head Tilt",
        directive: keep_scene!(
            "A portrait of the person from the original photo, with their head tilted slightly, showing a curious and engaging expression."
        ),
        category: StyleCategory::Portraits,
    },
    JobSpec {
        name: "Playful Wink",
        directive: keep_scene!(
            "A close-up portrait of the person from the original photo giving a playful wink to the camera."
        ),
        category: StyleCategory::Portraits,
    },
    JobSpec {
        name: "Soft Smile",
        directive: keep_scene!(
            "A portrait of the person from the original photo with a soft, gentle, closed-mouth smile."
        ),
        category: StyleCategory::Portraits,
    },
    JobSpec {
        name: "Confident Full Body",
        directive: keep_scene!(
            "A full-body shot of the person from the original photo, showing their complete outfit. They should be standing in a relaxed but confident pose."
        ),
        category: StyleCategory::FullAndMedium,
    },
    JobSpec {
        name: "Walking Pose",
        directive: keep_scene!(
            "A full-body shot of the person from the original photo, captured as if they are walking confidently."
        ),
        category: StyleCategory::FullAndMedium,
    },
    JobSpec {
        name: "Hands in Pockets",
        directive: keep_scene!(
            "A medium shot of the person from the original photo, standing casually with their hands in their pockets."
        ),
        category: StyleCategory::FullAndMedium,
    },
    JobSpec {
        name: "Arms Crossed",
        directive: keep_scene!(
            "A medium shot of the person from the original photo, with their arms crossed confidently, looking directly at the camera."
        ),
        category: StyleCategory::FullAndMedium,
    },
    JobSpec {
        name: "Hand on Hip",
        directive: keep_scene!(
            "A three-quarter shot of the person from the original photo with one hand placed confidently on their hip."
        ),
        category: StyleCategory::FullAndMedium,
    },
    JobSpec {
        name: "Leaning Pose",
        directive: keep_scene!(
            "A full-body shot of the person from the original photo, leaning casually against an unseen object, looking relaxed."
        ),
        category: StyleCategory::FullAndMedium,
    },
    JobSpec {
        name: "Looking Down",
        directive: keep_scene!(
            "A medium shot of the person from the original photo looking down with a gentle, introspective expression."
        ),
        category: StyleCategory::FullAndMedium,
    },
    JobSpec {
        name: "Dynamic Pose",
        directive: keep_scene!(
            "A photo of the person from the original photo in a more dynamic or active pose, like turning, walking, or interacting with the environment."
        ),
        category: StyleCategory::DynamicAndCandid,
    },
    JobSpec {
        name: "Candid Moment",
        directive: keep_scene!(
            "A candid-style photo of the person from the original photo, as if they were captured in a natural, unposed moment, perhaps adjusting their clothing or hair."
        ),
        category: StyleCategory::DynamicAndCandid,
    },
    JobSpec {
        name: "Looking Over Shoulder",
        directive: keep_scene!(
            "A photo of the person from the original photo, looking back over their shoulder at the camera with a slight smile."
        ),
        category: StyleCategory::DynamicAndCandid,
    },
    JobSpec {
        name: "Hair in Motion",
        directive: keep_scene!(
            "A dynamic photo of the person from the original photo where their hair is in motion, as if caught in a gentle breeze or during a turn."
        ),
        category: StyleCategory::DynamicAndCandid,
    },
    JobSpec {
        name: "Adjusting Jacket",
        directive: keep_scene!(
            "A candid-style photo of the person from the original photo in the middle of adjusting their jacket, collar, or sleeve."
        ),
        category: StyleCategory::DynamicAndCandid,
    },
    JobSpec {
        name: "Hand Towards Camera",
        directive: keep_scene!(
            "A dynamic photo where the person from the original photo is reaching one hand out towards the camera in a friendly, inviting gesture."
        ),
        category: StyleCategory::DynamicAndCandid,
    },
];

/// All templates in display order.
pub fn all() -> &'static [JobSpec] {
    STYLES
}

/// Look up a template by its exact name.
pub fn find(name: &str) -> Option<&'static JobSpec> {
    STYLES.iter().find(|s| s.name == name)
}

/// Like [`find`], with a miss reported as [`DispatchError::UnknownJob`].
pub fn lookup(name: &str) -> Result<&'static JobSpec, DispatchError> {
    find(name).ok_or_else(|| DispatchError::UnknownJob(name.to_string()))
}

/// Templates grouped by category, categories and members in display order.
pub fn by_category() -> Vec<(StyleCategory, Vec<&'static JobSpec>)> {
    StyleCategory::iter()
        .map(|category| {
            let members = STYLES.iter().filter(|s| s.category == category).collect();
            (category, members)
        })
        .collect()
}

/// Resolve user-chosen names into a selection ordered by catalog position.
///
/// Repeated names collapse into one entry. Any unknown name rejects the
/// whole selection, as does an empty one.
pub fn select<S: AsRef<str>>(names: &[S]) -> Result<RunSelection, DispatchError> {
    if names.is_empty() {
        return Err(DispatchError::EmptySelection);
    }
    if let Some(unknown) = names.iter().find(|n| find(n.as_ref()).is_none()) {
        return Err(DispatchError::UnknownJob(unknown.as_ref().to_string()));
    }
    Ok(RunSelection::new(
        STYLES
            .iter()
            .filter(|s| names.iter().any(|n| n.as_ref() == s.name)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = all().iter().map(|s| s.name).collect();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn test_find_known_and_unknown() {
        let spec = find("Playful Wink").unwrap();
        assert_eq!(spec.category, StyleCategory::Portraits);
        assert!(spec.directive.ends_with("as the original image."));
        assert!(find("playful wink").is_none());
        assert!(matches!(lookup("Moonwalk"), Err(DispatchError::UnknownJob(n)) if n == "Moonwalk"));
    }

    #[test]
    fn test_categories_cover_catalog() {
        let grouped = by_category();
        assert_eq!(grouped.len(), 3);
        let total: usize = grouped.iter().map(|(_, members)| members.len()).sum();
        assert_eq!(total, all().len());
        assert_eq!(grouped[0].0.to_string(), "Portraits & Close-ups");
    }

    #[test]
    fn test_select_uses_catalog_order() {
        let selection = select(&["Walking Pose", "Smiling Portrait", "Walking Pose"]).unwrap();
        assert_eq!(
            selection.names().collect::<Vec<_>>(),
            vec!["Smiling Portrait", "Walking Pose"]
        );
    }

    #[test]
    fn test_select_rejects_empty_and_unknown() {
        let empty: [&str; 0] = [];
        assert!(matches!(select(&empty), Err(DispatchError::EmptySelection)));
        assert!(matches!(
            select(&["Smiling Portrait", "Cartwheel"]),
            Err(DispatchError::UnknownJob(n)) if n == "Cartwheel"
        ));
    }
}
