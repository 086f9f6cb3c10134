mod calibration_points;
