mod navigator;
