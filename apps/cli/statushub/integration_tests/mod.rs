mod device_pair;
