//! Numeric command ids of the external tool, keyed by their menu path.
//!
//! The tool identifies commands by the id of the GUI menu entry that runs
//! them, e.g. `sfm/pairwise/compute_missing_match`.

pub const OPEN_MULTI_IMAGES: u32 = 33166;
pub const EXIT_PROGRAM: u32 = 32842;
pub const COMPUTE_MISSING_MATCH: u32 = 33033;
pub const IMPORT_FEATURE_MATCHES: u32 = 33486;
pub const RECONSTRUCT_SPARSE: u32 = 33041;
pub const RECONSTRUCT_DENSE: u32 = 33471;
pub const SAVE_NVIEW_MATCH: u32 = 33044;

const MENU: &[(&str, u32)] = &[
    ("file/open_multi_images", OPEN_MULTI_IMAGES),
    ("file/open_image_and_sift", 33028),
    ("file/open_current_path", 33186),
    ("file/detect_features", 32928),
    ("file/load_feature_file", 33167),
    ("file/new_window", 32841),
    ("file/close_window", 105),
    ("file/exit_program", EXIT_PROGRAM),
    ("sfm/reconstruct_sparse", RECONSTRUCT_SPARSE),
    ("sfm/reconstruct_resume", 33065),
    ("sfm/reconstruct_dense", RECONSTRUCT_DENSE),
    ("sfm/load_nview_match", 33045),
    ("sfm/add_nview_match", 33202),
    ("sfm/save_nview_match", SAVE_NVIEW_MATCH),
    ("sfm/clear_workspace", 33047),
    ("sfm/delete_selected_camera", 33074),
    ("sfm/delete_selected_model", 33216),
    ("sfm/delete_all_models", 33237),
    ("sfm/twoview/two_view_match", 33046),
    ("sfm/twoview/feature_match", 33018),
    ("sfm/twoview/f_matrix_match", 33023),
    ("sfm/twoview/guided_match", 33277),
    ("sfm/twoview/h_matrix_match", 33059),
    ("sfm/twoview/save_inlier_match", 33057),
    ("sfm/twoview/load_inlier_match", 33021),
    ("sfm/twoview/discard_inlier_match", 33239),
    ("sfm/twoview/save_as_nv_match", 33282),
    ("sfm/twoview/mutual_best_match", 33296),
    ("sfm/twoview/use_small_features", 33298),
    ("sfm/twoview/no_stationary_points", 33499),
    ("sfm/pairwise/compute_missing_match", COMPUTE_MISSING_MATCH),
    ("sfm/pairwise/compute_specified_match", 33487),
    ("sfm/pairwise/compute_sequence_match", 33498),
    ("sfm/pairwise/compute_missing_f_matrix", 33043),
    ("sfm/pairwise/update_pairwise_f_matrix", 33220),
    ("sfm/pairwise/use_preemptive_matching", 33507),
    ("sfm/pairwise/multi_threaded_match", 33191),
    ("sfm/pairwise/asynchronous_match", 33477),
    ("sfm/pairwise/use_filetitle_as_identifier", 33228),
    ("sfm/pairwise/import_feature_matches", IMPORT_FEATURE_MATCHES),
    ("sfm/pairwise/export_feature_matches", 33473),
    ("sfm/pairwise/export_f_matrix_matches", 33503),
    ("sfm/pairwise/show_spanning_forest", 34000),
    ("sfm/pairwise/show_match_matrix", 33268),
    ("sfm/more/reload_all_settings", 33152),
    ("sfm/more/start_new_model", 33212),
    ("sfm/more/set_initialization_pair", 33184),
    ("sfm/more/set_fixed_calibration", 33299),
    ("sfm/more/bundle_adjustment", 33061),
    ("sfm/more/reconstruct_mesh", 33523),
    ("sfm/more/gcp_based_transform", 33489),
    ("sfm/more/gps_based_transform", 33500),
    ("sfm/more/find_more_points", 33066),
    ("sfm/more/run_constrained_ba", 33531),
    ("sfm/more/update_point_color", 33367),
    ("sfm/more/update_thumbnails", 33405),
    ("sfm/more/use_shared_calibration", 33508),
    ("sfm/more/search_multiple_models", 33210),
    ("sfm/more/use_radial_distortion", 33185),
    ("sfm/more/filter_unstable_points", 33201),
    ("sfm/more/less_visualization_data", 33229),
    ("sfm/more/use_level_0_for_pmvs", 33519),
    ("sfm/extra/model_information", 33225),
    ("sfm/extra/save_compact_nvm", 33200),
    ("sfm/extra/save_selected_model", 33223),
    ("sfm/extra/save_separate_models", 33226),
    ("sfm/extra/delete_current_photo", 33048),
    ("sfm/extra/delete_reconstructed", 33198),
    ("sfm/extra/delete_not_in_nvm", 33355),
    ("view/single_image", 32777),
    ("view/feature_matches", 33019),
    ("view/inlier_matches", 33007),
    ("view/2_view_3d_points", 33005),
    ("view/n_view_3d_points", 33037),
    ("view/dense_3d_points", 33467),
    ("view/image_thumbnails", 33190),
    ("view/perspective_view", 33530),
    ("view/dark_background", 33451),
    ("view/show_single_model", 33218),
    ("view/show_2view_tracks", 33034),
    ("view/hilight_image", 33078),
    ("view/hilight_matcher", 33038),
    ("view/next_photo_pair", 33032),
    ("view/prev_photo_pair", 33049),
    ("view/options/switch_2d_3d", 33077),
    ("view/options/show_3+_points", 33070),
    ("view/options/textured_camera", 33042),
    ("view/options/show_bounding_box", 33012),
    ("view/options/downward_3d_y_axis", 33505),
    ("view/options/show_features", 32922),
    ("view/options/tight_thumbnails", 33234),
    ("view/options/show_rand_match", 33025),
    ("view/options/horizontal_layout", 33344),
    ("view/options/align_two_images", 33246),
];

/// Looks up a command id by menu path, e.g. `"sfm/pairwise/compute_missing_match"`.
/// Leading/trailing slashes and case are ignored.
pub fn lookup(path: &str) -> Option<u32> {
    let path = path.trim_matches('/').to_lowercase();
    MENU.iter().find(|(p, _)| *p == path).map(|(_, id)| *id)
}

pub fn path_of(id: u32) -> Option<&'static str> {
    MENU.iter().find(|(_, i)| *i == id).map(|(p, _)| *p)
}

pub fn entries() -> impl Iterator<Item = (&'static str, u32)> {
    MENU.iter().copied()
}
